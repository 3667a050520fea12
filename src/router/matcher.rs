//! Tool name filtering and resource URI template matching

use glob::Pattern;
use std::collections::HashMap;

/// Glob allow-list over fully-prefixed tool names
#[derive(Debug, Clone, Default)]
pub struct ToolFilter {
    patterns: Vec<Pattern>,
}

impl ToolFilter {
    /// A filter that allows every tool
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a filter from glob patterns such as `dns_*`
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, String> {
        let mut filter = Self::new();
        for pattern in patterns {
            filter.add_pattern(pattern.as_ref())?;
        }
        Ok(filter)
    }

    pub fn add_pattern(&mut self, pattern: &str) -> Result<(), String> {
        let glob = Pattern::new(pattern).map_err(|e| format!("Invalid tool pattern '{}': {}", pattern, e))?;
        self.patterns.push(glob);
        Ok(())
    }

    /// Whether a tool is exposed. An empty filter allows everything.
    pub fn allows(&self, tool_name: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.matches(tool_name))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A resource URI template like `domains://{domain}/records/{record_id}`
#[derive(Debug, Clone, PartialEq)]
pub struct UriTemplate {
    template: String,
    scheme: String,
    segments: Vec<Segment>,
}

impl UriTemplate {
    pub fn parse(template: &str) -> Result<Self, String> {
        let (scheme, rest) = template
            .split_once("://")
            .ok_or_else(|| format!("URI template '{}' has no scheme", template))?;

        let segments = rest
            .split('/')
            .map(|segment| {
                match segment
                    .strip_prefix('{')
                    .and_then(|s| s.strip_suffix('}'))
                {
                    Some(name) if !name.is_empty() => Ok(Segment::Param(name.to_string())),
                    Some(_) => Err(format!("Empty parameter in URI template '{}'", template)),
                    None => Ok(Segment::Literal(segment.to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            template: template.to_string(),
            scheme: scheme.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// True when the template has no parameters (a concrete URI)
    pub fn is_concrete(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Match a URI, returning captured parameters on success
    pub fn matches(&self, uri: &str) -> Option<HashMap<String, String>> {
        let (scheme, rest) = uri.split_once("://")?;
        if scheme != self.scheme {
            return None;
        }

        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(_) if part.is_empty() => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.to_string());
                }
            }
        }
        Some(params)
    }
}
