use crate::constants::SEPARATOR;

/// Resolves relative settings paths against the last absolute one.
///
/// Absolute paths are empty or start with `/`. A relative path is appended
/// to the parent of the most recent absolute path:
///
/// ```
/// use miniconf_mqtt_client::PathCursor;
///
/// let mut cursor = PathCursor::default();
/// assert_eq!(cursor.normalize("/driver/0"), "/driver/0");
/// assert_eq!(cursor.normalize("gain"), "/driver/gain");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathCursor {
    current: String,
}

impl PathCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parent of the last absolute path seen
    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn normalize(
        &mut self,
        path: &str,
    ) -> String {
        if path.is_empty() || path.starts_with(SEPARATOR) {
            let parent = path.rfind(SEPARATOR).unwrap_or(0);
            self.current = path[..parent].to_string();
            path.to_string()
        } else {
            format!("{}{SEPARATOR}{path}", self.current)
        }
    }
}
