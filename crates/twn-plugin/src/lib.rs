mod touch;

use std::collections::BTreeSet;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use twn_extract::Extractor;

pub use touch::{touch_file, FsToucher, Toucher};
pub use twn_extract::{ExtractOptions, LIBRARY_NAME};

/// Present once the directive has been injected into a stylesheet.
pub const INJECTION_MARKER: &str = "@source inline(";

/// Matches the stylesheet that pulls in Tailwind: `@import "tailwindcss";`.
pub const DEFAULT_CSS_ENTRY_PATTERN: &str = r#"@import\s+["']tailwindcss["']"#;

/// Which stylesheet stays the entry when more than one imports Tailwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryPolicy {
    /// The most recently visited stylesheet replaces the previous entry.
    #[default]
    LastWins,
    /// The first stylesheet seen stays the entry for the whole session.
    FirstWins,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginOptions {
    /// Regex a `.css` file must match to become the entry.
    pub css_entry_pattern: String,
    pub entry_policy: EntryPolicy,
    pub extract: ExtractOptions,
    /// Bump the entry's mtime whenever new classes are found.
    pub touch: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            css_entry_pattern: DEFAULT_CSS_ENTRY_PATTERN.into(),
            entry_policy: EntryPolicy::default(),
            extract: ExtractOptions::default(),
            touch: true,
        }
    }
}

/// One build or dev session of the transform hook.
///
/// Collects classes from every visited JS/TS module and prepends an
/// `@source inline("...")` directive to the Tailwind entry stylesheet.
/// The class set only grows for the lifetime of the instance.
pub struct TwnPlugin {
    options: PluginOptions,
    extractor: Extractor,
    css_entry_re: Regex,
    classes: BTreeSet<String>,
    snapshot: BTreeSet<String>,
    css_entry: Option<String>,
    toucher: Box<dyn Toucher>,
}

impl TwnPlugin {
    pub fn new(options: PluginOptions) -> Result<Self, regex::Error> {
        let css_entry_re = Regex::new(&options.css_entry_pattern)?;
        Ok(Self {
            extractor: Extractor::new(options.extract.clone()),
            options,
            css_entry_re,
            classes: BTreeSet::new(),
            snapshot: BTreeSet::new(),
            css_entry: None,
            toucher: Box::new(FsToucher),
        })
    }

    /// Replace the default [`FsToucher`].
    pub fn with_toucher(mut self, toucher: impl Toucher + 'static) -> Self {
        self.toucher = Box::new(toucher);
        self
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// Every class collected so far.
    pub fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }

    pub fn css_entry(&self) -> Option<&str> {
        self.css_entry.as_deref()
    }

    /// The transform hook. Returns `None` when `code` is left unchanged.
    pub fn transform(&mut self, code: &str, id: &str) -> Option<String> {
        if id.ends_with(".css") && self.css_entry_re.is_match(code) {
            self.record_entry(id);
        }

        let found = self.extractor.extract(code, id);
        if !found.is_empty() {
            tracing::debug!(file = id, count = found.len(), "Collected twn classes");
            self.classes.extend(found);
        }

        if self.classes != self.snapshot && !self.classes.is_empty() {
            if let Some(entry) = &self.css_entry {
                if self.options.touch {
                    self.toucher.touch(Path::new(entry));
                }
                self.snapshot.clone_from(&self.classes);
            }
        }

        if self.css_entry.as_deref() != Some(id) {
            return None;
        }
        let injected = self.inject(code)?;
        tracing::debug!(file = id, classes = self.classes.len(), "Injected @source inline");
        Some(injected)
    }

    /// Prepend the directive to `code` unless it already carries one.
    pub fn inject(&self, code: &str) -> Option<String> {
        if code.contains(INJECTION_MARKER) {
            return None;
        }
        let directive = self.directive()?;
        Some(format!("{directive}\n{code}"))
    }

    /// `@source inline("...");` for the classes collected so far, `None` when there are none.
    pub fn directive(&self) -> Option<String> {
        if self.classes.is_empty() {
            return None;
        }
        let joined = self
            .classes
            .iter()
            .map(|class| escape_css_string(class))
            .collect::<Vec<_>>()
            .join(" ");
        Some(format!("{INJECTION_MARKER}\"{joined}\");"))
    }

    fn record_entry(&mut self, id: &str) {
        match self.css_entry.as_deref() {
            Some(current) if current == id => return,
            Some(current) if self.options.entry_policy == EntryPolicy::FirstWins => {
                tracing::warn!(entry = current, "Ignoring additional Tailwind entry {id}");
                return;
            }
            Some(current) => tracing::info!(previous = current, "Tailwind entry is now {id}"),
            None => tracing::info!("Tailwind entry is {id}"),
        }
        self.css_entry = Some(id.to_string());
    }
}

impl Default for TwnPlugin {
    fn default() -> Self {
        Self::new(PluginOptions::default()).expect("default CSS entry pattern is valid")
    }
}

/// Remove previously injected directive lines, e.g. before rewriting a stylesheet on disk.
pub fn strip_directive(code: &str) -> String {
    let mut rest = code;
    while rest.starts_with(INJECTION_MARKER) {
        rest = match rest.find('\n') {
            Some(end) => &rest[end + 1..],
            None => "",
        };
    }
    rest.to_string()
}

/// Escape a class for use inside a double-quoted CSS string.
fn escape_css_string(class: &str) -> String {
    class.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    const CSS: &str = "@import \"tailwindcss\";\n";
    const BUTTON: &str = r#"
        import { twn } from 'tailwind-nested';
        export const cls = twn("px-4", { hover: "bg-blue-600" });
    "#;
    const CARD: &str = r#"
        import { twn } from 'tailwind-nested';
        export const cls = twn("p-4", { md: { "&": "p-6", span: "text-lg" } });
    "#;

    #[derive(Clone, Default)]
    struct RecordingToucher(Arc<Mutex<Vec<PathBuf>>>);

    impl RecordingToucher {
        fn count(&self) -> usize {
            self.0.lock().unwrap().len()
        }
    }

    impl Toucher for RecordingToucher {
        fn touch(&self, path: &Path) {
            self.0.lock().unwrap().push(path.to_path_buf());
        }
    }

    fn plugin() -> (TwnPlugin, RecordingToucher) {
        let toucher = RecordingToucher::default();
        let plugin = TwnPlugin::default().with_toucher(toucher.clone());
        (plugin, toucher)
    }

    #[test]
    fn test_injects_into_entry() {
        let (mut plugin, _) = plugin();
        assert_eq!(plugin.transform(CSS, "/src/index.css"), None);
        assert_eq!(plugin.css_entry(), Some("/src/index.css"));
        assert_eq!(plugin.transform(BUTTON, "/src/Button.tsx"), None);

        let out = plugin.transform(CSS, "/src/index.css").unwrap();
        assert_eq!(
            out,
            "@source inline(\"hover:bg-blue-600 px-4\");\n@import \"tailwindcss\";\n"
        );
    }

    #[test]
    fn test_injection_is_idempotent() {
        let (mut plugin, _) = plugin();
        plugin.transform(BUTTON, "/src/Button.tsx");
        let once = plugin.transform(CSS, "/src/index.css").unwrap();
        assert_eq!(plugin.transform(&once, "/src/index.css"), None);
    }

    #[test]
    fn test_no_injection_without_classes() {
        let (mut plugin, toucher) = plugin();
        assert_eq!(plugin.transform(CSS, "/src/index.css"), None);
        assert_eq!(plugin.directive(), None);
        assert_eq!(toucher.count(), 0);
    }

    #[test]
    fn test_other_stylesheets_untouched() {
        let (mut plugin, _) = plugin();
        plugin.transform(CSS, "/src/index.css");
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(plugin.transform(".btn { color: red; }", "/src/button.css"), None);
        assert_eq!(plugin.css_entry(), Some("/src/index.css"));
    }

    #[test]
    fn test_touches_entry_when_classes_grow() {
        let (mut plugin, toucher) = plugin();
        plugin.transform(CSS, "/src/index.css");
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(toucher.count(), 1);

        // Same classes again: nothing new.
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(toucher.count(), 1);

        plugin.transform(CARD, "/src/Card.tsx");
        assert_eq!(toucher.count(), 2);
        assert_eq!(
            toucher.0.lock().unwrap().as_slice(),
            &[PathBuf::from("/src/index.css"), PathBuf::from("/src/index.css")]
        );
    }

    #[test]
    fn test_pending_classes_touch_once_entry_is_known() {
        let (mut plugin, toucher) = plugin();
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(toucher.count(), 0);

        let out = plugin.transform(CSS, "/src/index.css").unwrap();
        assert!(out.starts_with("@source inline(\"hover:bg-blue-600 px-4\");\n"));
        assert_eq!(toucher.count(), 1);
    }

    #[test]
    fn test_failed_touch_keeps_classes() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("gone.css").to_string_lossy().into_owned();
        assert!(touch_file(Path::new(&entry)).is_err());

        let mut plugin = TwnPlugin::default();
        assert_eq!(plugin.transform(CSS, &entry), None);
        assert_eq!(plugin.transform(BUTTON, "/src/Button.tsx"), None);
        assert_eq!(plugin.classes().len(), 2);

        assert_eq!(plugin.transform(CARD, "/src/Card.tsx"), None);
        assert_eq!(plugin.classes().len(), 5);
        let out = plugin.transform(CSS, &entry).unwrap();
        assert_eq!(out, format!("{}\n{CSS}", plugin.directive().unwrap()));
    }

    #[test]
    fn test_touch_disabled() {
        let toucher = RecordingToucher::default();
        let options = PluginOptions {
            touch: false,
            ..Default::default()
        };
        let mut plugin = TwnPlugin::new(options).unwrap().with_toucher(toucher.clone());
        plugin.transform(CSS, "/src/index.css");
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(toucher.count(), 0);
    }

    #[test]
    fn test_last_entry_wins_by_default() {
        let (mut plugin, _) = plugin();
        plugin.transform(CSS, "/src/a.css");
        plugin.transform(CSS, "/src/b.css");
        assert_eq!(plugin.css_entry(), Some("/src/b.css"));
        plugin.transform(BUTTON, "/src/Button.tsx");
        let out = plugin.transform(CSS, "/src/a.css").unwrap();
        assert_eq!(out, format!("{}\n{CSS}", plugin.directive().unwrap()));
        assert_eq!(plugin.css_entry(), Some("/src/a.css"));
    }

    #[test]
    fn test_first_entry_wins() {
        let options = PluginOptions {
            entry_policy: EntryPolicy::FirstWins,
            ..Default::default()
        };
        let mut plugin = TwnPlugin::new(options).unwrap().with_toucher(RecordingToucher::default());
        plugin.transform(CSS, "/src/a.css");
        plugin.transform(BUTTON, "/src/Button.tsx");
        assert_eq!(plugin.transform(CSS, "/src/b.css"), None);
        assert_eq!(plugin.css_entry(), Some("/src/a.css"));
    }

    #[test]
    fn test_single_quoted_import_is_an_entry() {
        let (mut plugin, _) = plugin();
        plugin.transform("@import 'tailwindcss';", "/src/main.css");
        assert_eq!(plugin.css_entry(), Some("/src/main.css"));
        assert_eq!(plugin.transform("@import \"tailwindcss\";", "/src/theme.scss"), None);
        assert_eq!(plugin.css_entry(), Some("/src/main.css"));
    }

    #[test]
    fn test_class_set_is_monotonic() {
        let (mut plugin, _) = plugin();
        let inputs = [
            (BUTTON, "/src/Button.tsx"),
            ("const x = 1;", "/src/util.ts"),
            ("import 'tailwind-nested'; twn(", "/src/broken.ts"),
            (CSS, "/src/index.css"),
            (CARD, "/src/Card.tsx"),
            (BUTTON, "/src/Button.tsx"),
        ];
        let mut last = 0;
        for (code, id) in inputs {
            plugin.transform(code, id);
            assert!(plugin.classes().len() >= last);
            last = plugin.classes().len();
        }
        assert_eq!(last, 5);
    }

    #[test]
    fn test_directive_escapes_quotes() {
        let (mut plugin, _) = plugin();
        plugin.transform(
            r#"import { twn } from 'tailwind-nested'; twn("", { before: 'content-["→"]' });"#,
            "/src/Arrow.ts",
        );
        assert_eq!(
            plugin.directive().unwrap(),
            r#"@source inline("before:content-[\"→\"]");"#
        );
    }

    #[test]
    fn test_strip_directive() {
        let (mut plugin, _) = plugin();
        plugin.transform(BUTTON, "/src/Button.tsx");
        let injected = plugin.transform(CSS, "/src/index.css").unwrap();
        assert_eq!(strip_directive(&injected), CSS);
        assert_eq!(strip_directive(CSS), CSS);
        assert_eq!(strip_directive("@source inline(\"a\");"), "");
    }

    #[test]
    fn test_inject_ignores_entry_identity() {
        let (mut plugin, _) = plugin();
        assert_eq!(plugin.inject(CSS), None);
        plugin.transform(CARD, "/src/Card.tsx");
        let out = plugin.inject(".card {}").unwrap();
        assert_eq!(out, "@source inline(\"md:p-6 md:span:text-lg p-4\");\n.card {}");
    }

    #[test]
    fn test_invalid_entry_pattern() {
        let options = PluginOptions {
            css_entry_pattern: "(".into(),
            ..Default::default()
        };
        assert!(TwnPlugin::new(options).is_err());
    }

    #[test]
    fn test_options_from_json() {
        let options: PluginOptions = serde_json::from_str(
            r#"{ "entryPolicy": "firstWins", "touch": false, "extract": { "functionName": "cx" } }"#,
        )
        .unwrap();
        assert_eq!(options.entry_policy, EntryPolicy::FirstWins);
        assert!(!options.touch);
        assert_eq!(options.extract.function_name, "cx");
        assert_eq!(options.css_entry_pattern, DEFAULT_CSS_ENTRY_PATTERN);
    }
}
