use std::fmt;

use serde::de::DeserializeOwned;

/// A decode failure located by JSON path.
#[derive(Debug, Clone, PartialEq)]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at JSON path {} → {}", self.path, self.message)
    }
}

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, PathError> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(|err| PathError {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Outer { inner: Vec<Inner> }

    #[derive(Debug, serde::Deserialize)]
    #[allow(dead_code)]
    struct Inner { flag: bool }

    #[test]
    fn errors_name_the_offending_path() {
        let err = from_str_with_path::<Outer>(r#"{"inner":[{"flag":true},{"flag":3}]}"#).unwrap_err();
        assert_eq!(err.path, "inner[1].flag");
        assert!(err.to_string().starts_with("at JSON path inner[1].flag"));
    }
}
