use crate::dom::xpath;
use crate::error::{NavError, Result};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

fn re_position_predicate() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[\d+\]").unwrap())
}

/// Generalized pattern over a family of XPaths that differ only in the sibling index of one
/// element, e.g. the rows of a repeated list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicXPath {
    /// Shared leading part, ending just before the varying segment
    pub prefix: String,

    /// Shared trailing part, starting just after the varying segment
    pub suffix: String,

    /// Tag of the element whose index varies (empty for a degenerate pattern)
    pub dynamic_tag: String,

    /// Number of xpaths the pattern was mined from
    pub family_size: usize,

    /// Segments between prefix and suffix; anything but one cannot be matched
    #[serde(default)]
    pub varying_segments: usize,
}

impl DynamicXPath {
    /// Mine the pattern shared by a non-empty family of xpaths
    pub fn mine<S: AsRef<str>>(family: &[S]) -> Result<Self> {
        let mut members: Vec<&str> = family.iter().map(|x| x.as_ref()).collect();
        if members.is_empty() {
            return Err(NavError::malformed("", "empty xpath family"));
        }
        members.sort_by(|a, b| b.len().cmp(&a.len()));

        let longest = members[0].as_bytes();
        let min_len = members.iter().map(|m| m.len()).min().unwrap_or(0);

        let mut prefix_len = 0;
        while prefix_len < min_len
            && members
                .iter()
                .all(|m| m.as_bytes()[prefix_len].eq_ignore_ascii_case(&longest[prefix_len]))
        {
            prefix_len += 1;
        }

        // Stop before the suffix would overlap the prefix of the shortest member
        let mut suffix_len = 0;
        while prefix_len + suffix_len < min_len
            && members.iter().all(|m| {
                let bytes = m.as_bytes();
                bytes[bytes.len() - 1 - suffix_len]
                    .eq_ignore_ascii_case(&longest[longest.len() - 1 - suffix_len])
            })
        {
            suffix_len += 1;
        }

        let longest = members[0];
        if members.len() == 1 {
            return Ok(Self {
                prefix: longest.to_string(),
                suffix: String::new(),
                dynamic_tag: String::new(),
                family_size: 1,
                varying_segments: 0,
            });
        }

        // Snap both ends to segment boundaries so the varying segment is whole
        let prefix_end = longest
            .get(..prefix_len)
            .and_then(|p| p.rfind('/'))
            .unwrap_or(0);
        let suffix_start = longest.len() - suffix_len;
        let suffix_start = longest
            .get(suffix_start..)
            .and_then(|s| s.find('/'))
            .map_or(longest.len(), |offset| suffix_start + offset);

        let residual = longest.get(prefix_end..suffix_start).unwrap_or("");
        let dynamic_tag = xpath::tag_of(residual).unwrap_or("").to_string();
        let varying_segments = residual.split('/').filter(|s| !s.is_empty()).count();
        if varying_segments > 1 {
            log::debug!("Family varies across {} segments: {}", varying_segments, residual);
        }

        Ok(Self {
            prefix: longest[..prefix_end].to_string(),
            suffix: longest[suffix_start..].to_string(),
            dynamic_tag,
            family_size: members.len(),
            varying_segments,
        })
    }

    /// A pattern with no varying segment only matches the path it was mined from
    pub fn is_degenerate(&self) -> bool {
        self.dynamic_tag.is_empty()
    }

    /// Single-member, degenerate or multi-segment patterns should not be trusted for
    /// generalization
    pub fn is_low_confidence(&self) -> bool {
        self.family_size < 2 || self.is_degenerate() || self.varying_segments != 1
    }

    /// Whether a concrete xpath belongs to the family
    pub fn matches(&self, candidate: &str) -> bool {
        let (p, s) = (self.prefix.len(), self.suffix.len());
        if candidate.len() < p + s {
            return false;
        }

        let head = candidate.get(..p);
        let tail = candidate.get(candidate.len() - s..);
        let middle = candidate.get(p..candidate.len() - s);
        let (Some(head), Some(tail), Some(middle)) = (head, tail, middle) else {
            return false;
        };

        if !head.eq_ignore_ascii_case(&self.prefix) || !tail.eq_ignore_ascii_case(&self.suffix) {
            return false;
        }

        if self.is_degenerate() {
            return middle.is_empty();
        }

        let segment = middle.strip_prefix('/').unwrap_or(middle);
        if segment.is_empty() || segment.contains('/') {
            return false;
        }

        xpath::tag_of(segment).is_some_and(|tag| tag.eq_ignore_ascii_case(&self.dynamic_tag))
    }

    /// XPath selecting every member of the family (the varying segment without its index)
    pub fn generalized(&self) -> String {
        if self.is_degenerate() {
            self.prefix.clone()
        } else {
            format!("{}/{}{}", self.prefix, self.dynamic_tag, self.suffix)
        }
    }
}

/// Shape of an xpath with every positional predicate removed
pub fn shape_of(xpath: &str) -> String {
    re_position_predicate().replace_all(xpath, "").into_owned()
}

/// Group xpaths by shape and mine one pattern per group of two or more.
///
/// Groups whose pattern does not match every member are dropped.
pub fn mine_families<S: AsRef<str>>(xpaths: &[S]) -> Vec<DynamicXPath> {
    let mut groups: IndexMap<String, Vec<&str>> = IndexMap::new();
    for x in xpaths {
        groups.entry(shape_of(x.as_ref())).or_default().push(x.as_ref());
    }

    groups
        .into_values()
        .filter(|family| family.len() > 1)
        .filter_map(|family| {
            let pattern = DynamicXPath::mine(&family).ok()?;
            let sound = !pattern.is_low_confidence() && family.iter().all(|m| pattern.matches(m));
            sound.then_some(pattern)
        })
        .collect()
}
