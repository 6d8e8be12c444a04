//! Page level types shared by the walker and the remote clients.

use std::fmt;

use crate::error::WalkError;

/// Opaque continuation token returned by a paginated endpoint.
///
/// An empty token is never constructed: servers signal the last page with
/// either no marker or an empty one, and both mean the same thing here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pagination parameters of a single remote call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub page_size_hint: Option<u32>,
}

impl PageRequest {
    pub fn first() -> Self {
        Self::default()
    }

    pub fn resume(cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
            page_size_hint: None,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size_hint = Some(page_size);
        self
    }
}

/// One page of results plus the cursor for the page after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> PageResult<T> {
    /// Build a page from a raw marker, treating an empty marker as absent.
    pub fn new(items: Vec<T>, marker: Option<String>) -> Self {
        Self {
            items,
            next_cursor: marker.and_then(Cursor::new),
        }
    }

    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

/// Page sizes an endpoint will accept in a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageBounds {
    pub min: u32,
    pub max: u32,
}

impl PageBounds {
    pub const fn up_to(max: u32) -> Self {
        Self { min: 1, max }
    }

    pub const fn between(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub(crate) fn validate(&self) -> Result<(), WalkError> {
        if self.max == 0 {
            return Err(WalkError::InvalidConfiguration(
                "server max page size must be positive".to_string(),
            ));
        }
        if self.min == 0 || self.min > self.max {
            return Err(WalkError::InvalidConfiguration(format!(
                "server min page size {} must be between 1 and {}",
                self.min, self.max
            )));
        }
        Ok(())
    }

    /// Clamp a requested size into `[min, max]`.
    pub fn clamp(&self, size: u32) -> u32 {
        size.max(self.min).min(self.max)
    }
}

/// How a single walk is steered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkConfig {
    pub bounds: PageBounds,
    /// Preferred page size; `None` asks for `bounds.max` on every call.
    pub page_size: Option<u32>,
    /// Resume from a cursor returned by an earlier listing.
    pub start_cursor: Option<Cursor>,
    /// Stop once this many items have been emitted.
    pub total_limit: Option<u64>,
}

impl WalkConfig {
    pub fn new(bounds: PageBounds) -> Self {
        Self {
            bounds,
            page_size: None,
            start_cursor: None,
            total_limit: None,
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn start_cursor(mut self, cursor: Cursor) -> Self {
        self.start_cursor = Some(cursor);
        self
    }

    pub fn total_limit(mut self, limit: u64) -> Self {
        self.total_limit = Some(limit);
        self
    }

    /// The caller is steering pagination by hand.
    pub fn is_manual(&self) -> bool {
        self.start_cursor.is_some() || self.total_limit.is_some()
    }

    pub(crate) fn validate(&self) -> Result<(), WalkError> {
        self.bounds.validate()?;
        if self.total_limit == Some(0) {
            return Err(WalkError::InvalidConfiguration(
                "total limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Page size to ask for when no total limit applies.
    pub(crate) fn preferred_page_size(&self) -> u32 {
        match self.page_size {
            Some(size) if size > 0 => self.bounds.clamp(size),
            _ => self.bounds.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_marker_is_no_cursor() {
        assert_eq!(Cursor::new(""), None);
        let page: PageResult<u8> = PageResult::new(vec![1], Some(String::new()));
        assert!(!page.has_more());

        let page: PageResult<u8> = PageResult::new(vec![1], Some("abc".to_string()));
        assert_eq!(page.next_cursor.as_ref().map(Cursor::as_str), Some("abc"));
    }

    #[test]
    fn bounds_validation() {
        assert!(PageBounds::up_to(100).validate().is_ok());
        assert!(PageBounds::between(20, 100).validate().is_ok());
        assert!(matches!(
            PageBounds::up_to(0).validate(),
            Err(WalkError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            PageBounds::between(50, 20).validate(),
            Err(WalkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn zero_total_limit_is_rejected() {
        let config = WalkConfig::new(PageBounds::up_to(100)).total_limit(0);
        assert!(matches!(
            config.validate(),
            Err(WalkError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn preferred_page_size_is_clamped() {
        let config = WalkConfig::new(PageBounds::between(20, 100));
        assert_eq!(config.preferred_page_size(), 100);
        assert_eq!(config.clone().page_size(500).preferred_page_size(), 100);
        assert_eq!(config.clone().page_size(5).preferred_page_size(), 20);
        assert_eq!(config.page_size(0).preferred_page_size(), 100);
    }
}
