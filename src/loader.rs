//! Directory scanning for view and partial sources.
//!
//! A scan walks a root directory recursively and registers every regular
//! file it finds as either a view or a partial, based on path convention:
//! a file whose relative path contains a directory segment literally named
//! `view` or `views` is a view source, everything else is a partial source.
//!
//! ```text
//! templates/
//!     base.html           partial
//!     views/
//!         index.html      view "views/index.html"
//!         about.html      view "views/about.html"
//!     partials/
//!         nav.html        partial "partials/nav.html"
//! ```
//!
//! Template names are the discovered paths with the configured prefix
//! stripped, `/`-separated on every platform. An extension allow-list can
//! be configured before the scan to skip editor droppings and the like.

use std::fs;
use std::path::{Component, Path};

use walkdir::WalkDir;

use crate::error::LoadError;
use crate::registry::Templates;

impl Templates {
    /// Restricts the next directory scan to the given file extensions.
    ///
    /// Entries may be given with or without the leading dot; matching is
    /// case-insensitive. With no allow-list configured, every regular file
    /// is taken. Call before [`parse_directory`](Self::parse_directory).
    pub fn add_extensions<I, S>(&mut self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extensions {
            let ext = ext.as_ref().trim_start_matches('.');
            self.extensions.push(ext.to_ascii_lowercase());
        }
    }

    /// Scans `root` recursively and registers everything it finds.
    ///
    /// Files are classified by the `view`/`views` path-segment convention
    /// and stored under their path with `strip_prefix` removed. Partials
    /// are registered before views so the bulk of the views compile with
    /// the full partial set already known (the synchronization pass makes
    /// the result order-independent either way).
    ///
    /// # Errors
    ///
    /// [`LoadError::NoViews`] / [`LoadError::NoPartials`] if the walk
    /// completed but one side of the convention is empty; each is reported
    /// separately so the caller can tell which half of the layout is
    /// missing. [`LoadError::Walk`] / [`LoadError::Io`] on traversal or
    /// read failures, and [`LoadError::Render`] if a discovered source
    /// fails to parse.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let mut templates = Templates::new();
    /// templates.add_extensions(["html", "tmpl"]);
    /// templates.parse_directory("templates/", "templates/")?;
    ///
    /// let out = templates.render_to_bytes(None, "views/index.html", &data)?;
    /// ```
    pub fn parse_directory(
        &mut self,
        root: impl AsRef<Path>,
        strip_prefix: impl AsRef<Path>,
    ) -> Result<(), LoadError> {
        let root = root.as_ref();
        let strip_prefix = strip_prefix.as_ref();

        let mut views: Vec<(String, String)> = Vec::new();
        let mut partials: Vec<(String, String)> = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.extension_allowed(path) {
                continue;
            }

            let source = fs::read_to_string(path).map_err(|e| LoadError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

            let relative = path.strip_prefix(strip_prefix).unwrap_or(path);
            let name = path_key(relative);
            if is_view_path(relative) {
                views.push((name, source));
            } else {
                partials.push((name, source));
            }
        }

        if views.is_empty() {
            return Err(LoadError::NoViews {
                root: root.to_path_buf(),
            });
        }
        if partials.is_empty() {
            return Err(LoadError::NoPartials {
                root: root.to_path_buf(),
            });
        }

        for (name, source) in partials {
            self.add_partial(name, &source)?;
        }
        for (name, source) in views {
            self.add_view(name, &source)?;
        }
        Ok(())
    }

    fn extension_allowed(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self
                .extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

/// A file is a view when a *directory* segment of its relative path is
/// literally `view` or `views`; the file name itself does not classify.
fn is_view_path(relative: &Path) -> bool {
    let Some(parent) = relative.parent() else {
        return false;
    };
    parent
        .components()
        .any(|c| matches!(c, Component::Normal(seg) if seg == "view" || seg == "views"))
}

/// Joins the normal components with `/` so names look the same on every
/// platform.
fn path_key(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(seg) => seg.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn write_file(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn test_scan_classifies_views_and_partials() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "views/index.tmpl", "index {{ title }}");
        write_file(dir.path(), "views/about.tmpl", "about");
        write_file(dir.path(), "partials/nav.tmpl", "nav");

        let mut templates = Templates::new();
        templates.parse_directory(dir.path(), dir.path()).unwrap();

        let mut views: Vec<_> = templates.view_names().collect();
        views.sort_unstable();
        assert_eq!(views, vec!["views/about.tmpl", "views/index.tmpl"]);
        assert_eq!(
            templates.partial_names().collect::<Vec<_>>(),
            vec!["partials/nav.tmpl"]
        );
    }

    #[test]
    fn test_scanned_views_reach_scanned_partials() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "partials/nav.tmpl", "<nav>{{ menu }}</nav>");
        write_file(
            dir.path(),
            "views/index.tmpl",
            r#"<html>{% include "partials/nav.tmpl" %}</html>"#,
        );

        let mut templates = Templates::new();
        templates.parse_directory(dir.path(), dir.path()).unwrap();

        let bytes = templates
            .render_to_bytes(None, "views/index.tmpl", &json!({"menu": "M"}))
            .unwrap();
        assert_eq!(bytes, b"<html><nav>M</nav></html>");
    }

    #[test]
    fn test_singular_view_segment_classifies() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "view/index.tmpl", "index");
        write_file(dir.path(), "nav.tmpl", "nav");

        let mut templates = Templates::new();
        templates.parse_directory(dir.path(), dir.path()).unwrap();

        assert!(templates.has_view("view/index.tmpl"));
        assert!(!templates.has_view("nav.tmpl"));
    }

    #[test]
    fn test_file_named_views_is_a_partial() {
        // Only directory segments classify; a file named "views" does not.
        assert!(!is_view_path(Path::new("views")));
        assert!(!is_view_path(Path::new("partials/views")));
        assert!(is_view_path(Path::new("views/index.html")));
        assert!(is_view_path(Path::new("pages/views/index.html")));
    }

    #[test]
    fn test_empty_views_is_a_structural_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("views")).unwrap();
        write_file(dir.path(), "partials/nav.tmpl", "nav");

        let mut templates = Templates::new();
        let result = templates.parse_directory(dir.path(), dir.path());
        assert!(matches!(result, Err(LoadError::NoViews { .. })));
    }

    #[test]
    fn test_missing_partials_is_reported_separately() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "views/index.tmpl", "index");

        let mut templates = Templates::new();
        let result = templates.parse_directory(dir.path(), dir.path());
        assert!(matches!(result, Err(LoadError::NoPartials { .. })));
    }

    #[test]
    fn test_extension_allow_list_filters() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "views/index.tmpl", "index");
        write_file(dir.path(), "views/index.tmpl.swp", "junk");
        write_file(dir.path(), "nav.tmpl", "nav");
        write_file(dir.path(), "README", "not a template");

        let mut templates = Templates::new();
        // Dotted and dotless spellings both work.
        templates.add_extensions([".tmpl"]);
        templates.parse_directory(dir.path(), dir.path()).unwrap();

        assert_eq!(templates.view_names().collect::<Vec<_>>(), vec!["views/index.tmpl"]);
        assert_eq!(templates.partial_names().collect::<Vec<_>>(), vec!["nav.tmpl"]);
    }

    #[test]
    fn test_strip_prefix_keys_are_relative() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "tmpl/views/index.html", "index");
        write_file(dir.path(), "tmpl/nav.html", "nav");

        let mut templates = Templates::new();
        templates
            .parse_directory(dir.path().join("tmpl"), dir.path().join("tmpl"))
            .unwrap();

        assert!(templates.has_view("views/index.html"));
        assert_eq!(templates.partial_names().collect::<Vec<_>>(), vec!["nav.html"]);
    }

    #[test]
    fn test_malformed_discovered_source_fails_the_scan() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "views/index.tmpl", "{% if %}");
        write_file(dir.path(), "nav.tmpl", "nav");

        let mut templates = Templates::new();
        let result = templates.parse_directory(dir.path(), dir.path());
        assert!(matches!(result, Err(LoadError::Render(_))));
    }
}
