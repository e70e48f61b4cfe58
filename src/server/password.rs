use std::convert;
use std::fmt;

/// A client supplied password. Holding it in this wrapper keeps it out of
/// Debug and Display output, and thereby out of the logs.
#[derive(PartialEq, Eq, Clone)]
pub struct Password {
    bytes: String,
}

impl Password {
    pub fn new(bytes: String) -> Self {
        Password { bytes }
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*******")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Password {{ bytes: ******* }}")
    }
}

impl convert::From<&str> for Password {
    fn from(s: &str) -> Self {
        Self::new(String::from(s))
    }
}

impl convert::AsRef<str> for Password {
    fn as_ref(&self) -> &str {
        self.bytes.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SECRET: &str = "supersecret";

    #[test]
    fn password_obscures_display() {
        assert_eq!("*******", format!("{}", password()));
    }

    #[test]
    fn password_obscures_debug() {
        assert_eq!("Password { bytes: ******* }", format!("{:?}", password()));
    }

    #[test]
    fn password_retrievable_as_ref() {
        assert_eq!(SECRET, password().as_ref())
    }

    fn password() -> Password {
        Password::new(SECRET.into())
    }
}
