use std::{
    fmt::Display,
    sync::{LazyLock, RwLock},
};

use nu_ansi_term::Color;

pub static COLOR: LazyLock<RwLock<bool>> =
    LazyLock::new(|| RwLock::new(std::env::var_os("NO_COLOR").is_none()));

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap();
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colored_respects_switch() {
        *COLOR.write().unwrap() = false;
        assert_eq!(Colored(Color::Green, "2.0").to_string(), "2.0");

        *COLOR.write().unwrap() = true;
        let colored = Colored(Color::Green, "2.0").to_string();
        assert!(colored.contains("2.0"));
        assert_ne!(colored, "2.0");
    }
}
