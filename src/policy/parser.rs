//! Robots.txt parsing
//!
//! Thin wrapper around the robotstxt crate's matcher, providing a simplified
//! interface for checking whether an address may be fetched.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = consult content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used as the default when robots.txt cannot be fetched or parsed.
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Checks if an address is allowed for the given user agent
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("https://example.com/any/path", "TestBot"));
        assert!(robots.is_allowed("https://example.com/admin", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_all() {
        let content = "User-agent: *\nDisallow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("https://example.com/", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/page", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let content = "User-agent: *\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("https://example.com/", "TestBot"));
        assert!(robots.is_allowed("https://example.com/page", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/admin/users", "TestBot"));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("https://example.com/", "TestBot"));
        assert!(!robots.is_allowed("https://example.com/private", "TestBot"));
        assert!(robots.is_allowed("https://example.com/private/public", "TestBot"));
    }

    #[test]
    fn test_parse_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("https://example.com/page", "GoodBot"));
        assert!(!robots.is_allowed("https://example.com/page", "BadBot"));
    }

    #[test]
    fn test_invalid_robots_txt() {
        let content = "This is not valid robots.txt {{{";
        let robots = ParsedRobots::from_content(content);
        // Unparseable directives impose no restrictions
        assert!(robots.is_allowed("https://example.com/any/path", "TestBot"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let robots = ParsedRobots::from_content("");
        assert!(robots.is_allowed("https://example.com/any/path", "TestBot"));
    }
}
