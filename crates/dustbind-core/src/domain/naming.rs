use std::path::{Component, Path};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use super::error::DomainError;

/// Template name for `file`: its path relative to `pages_root`, extension
/// stripped, components joined with `/`.
///
/// `pages/partials/footer.dust` under `pages` becomes `partials/footer`.
/// Files outside the root keep only their stem.
pub fn template_name(pages_root: &Path, file: &Path) -> String {
    let relative = match file.strip_prefix(pages_root) {
        Ok(relative) => relative,
        Err(_) => {
            return file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
    };

    let stripped = relative.with_extension("");
    stripped
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Template name patterns selecting what gets exported for the browser.
///
/// `*` matches any run of characters, including `/`. An empty whitelist
/// admits every name.
#[derive(Debug, Clone)]
pub struct Whitelist {
    set: Option<GlobSet>,
}

impl Whitelist {
    pub fn new(patterns: &[String]) -> Result<Self, DomainError> {
        if patterns.is_empty() {
            return Ok(Self { set: None });
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(false)
                .build()
                .map_err(|e| DomainError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| DomainError::InvalidPattern {
            pattern: patterns.join(", "),
            reason: e.to_string(),
        })?;
        Ok(Self { set: Some(set) })
    }

    pub fn allows(&self, name: &str) -> bool {
        match &self.set {
            Some(set) => set.is_match(name),
            None => true,
        }
    }
}
