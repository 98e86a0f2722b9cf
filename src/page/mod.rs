//! Page assembly.
//!
//! [`PageAssembler`] ties the pipeline together:
//!
//! 1. resolve the [`BookIndex`](crate::book::BookIndex)
//! 2. read every chapter (in parallel) and concatenate them in index order
//! 3. render the markdown in one sequential pass
//! 4. wrap the result in the page [`shell`], embedding the diagram script and
//!    math style sheet only when the pass asked for them
//! 5. reduce the style sheet against the final markup and splice it in
//!
//! Every file read along the way is reported in
//! [`RenderedPage::dependencies`].

pub mod shell;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::book::{
    BookIndex, DEFAULT_CHAPTER_EXTENSION, DEFAULT_ENTRY_CANDIDATES, IndexResolver, IndexSource,
    join_chapters, load_chapters,
};
use crate::css::StyleSheetPruner;
use crate::error::{Error, Result};
use crate::markdown::{
    AssetFlags, Heading, MarkdownRenderer, RenderOutput, SlugPolicy, TocConfig, render_toc,
    toc_text,
};
use crate::math::{MathMlRenderer, MathRenderer, default_macros};
use crate::util::{decode_text, format_long_date, today};

pub use shell::{STYLE_PLACEHOLDER, Shell, fill_style};

/// The bundled default style sheet.
pub const DEFAULT_STYLE: &str = include_str!("../../assets/style.css");

/// A text asset, given inline or read from a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSource {
    Inline(String),
    /// Resolved against the book's base directory unless absolute.
    File(PathBuf),
}

impl AssetSource {
    /// Read the asset, recording the file it came from.
    pub fn load(&self, base_dir: &Path, dependencies: &mut Vec<PathBuf>) -> Result<String> {
        match self {
            AssetSource::Inline(text) => Ok(text.clone()),
            AssetSource::File(path) => {
                let path = base_dir.join(path);
                let bytes = fs::read(&path).map_err(|e| Error::io(&path, e))?;
                let text = decode_text(&bytes).into_owned();
                dependencies.push(path);
                Ok(text)
            }
        }
    }
}

/// Everything that shapes one rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Directory the index, chapters and file assets are resolved against.
    pub base_dir: PathBuf,
    pub index: IndexSource,
    /// Entry documents tried when `index` is [`IndexSource::Default`].
    pub entry_candidates: Vec<String>,
    pub chapter_extension: String,
    /// Page style sheet; the bundled one when `None`.
    pub style: Option<AssetSource>,
    /// Appended to the style sheet when the page contains math.
    pub math_style: Option<AssetSource>,
    /// Embedded when the page contains a diagram.
    pub diagram_script: Option<AssetSource>,
    pub toc: TocConfig,
    pub slug: SlugPolicy,
    pub math_macros: BTreeMap<String, String>,
    /// Add the live-reload script.
    pub watch: bool,
    /// Date shown in the header; today when `None`.
    pub date: Option<NaiveDate>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            index: IndexSource::Default,
            entry_candidates: DEFAULT_ENTRY_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chapter_extension: DEFAULT_CHAPTER_EXTENSION.to_string(),
            style: None,
            math_style: None,
            diagram_script: None,
            toc: TocConfig::default(),
            slug: SlugPolicy::default(),
            math_macros: default_macros(),
            watch: false,
            date: None,
        }
    }
}

impl PageConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_index(mut self, index: IndexSource) -> Self {
        self.index = index;
        self
    }

    pub fn with_entry_candidates(mut self, candidates: Vec<String>) -> Self {
        self.entry_candidates = candidates;
        self
    }

    pub fn with_chapter_extension(mut self, extension: impl Into<String>) -> Self {
        self.chapter_extension = extension.into();
        self
    }

    pub fn with_style(mut self, style: AssetSource) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_math_style(mut self, style: AssetSource) -> Self {
        self.math_style = Some(style);
        self
    }

    pub fn with_diagram_script(mut self, script: AssetSource) -> Self {
        self.diagram_script = Some(script);
        self
    }

    pub fn with_toc(mut self, toc: TocConfig) -> Self {
        self.toc = toc;
        self
    }

    pub fn with_slug(mut self, slug: SlugPolicy) -> Self {
        self.slug = slug;
        self
    }

    pub fn with_math_macro(mut self, name: impl Into<String>, body: impl Into<String>) -> Self {
        self.math_macros.insert(name.into(), body.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// A finished page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    pub title: String,
    /// Top-level headings of the TOC tree.
    pub headings: Vec<Heading>,
    /// Every file read, in read order.
    pub dependencies: Vec<PathBuf>,
    pub assets: AssetFlags,
}

/// Renders a book into one page.
#[derive(Clone)]
pub struct PageAssembler {
    config: PageConfig,
    math: Option<Arc<dyn MathRenderer>>,
    pruner: StyleSheetPruner,
}

impl PageAssembler {
    pub fn new(config: PageConfig) -> Self {
        Self {
            config,
            math: None,
            pruner: StyleSheetPruner::default(),
        }
    }

    /// Replace the default MathML engine (and its macro table).
    pub fn with_math_renderer(mut self, math: Arc<dyn MathRenderer>) -> Self {
        self.math = Some(math);
        self
    }

    pub fn with_style_pruner(mut self, pruner: StyleSheetPruner) -> Self {
        self.pruner = pruner;
        self
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    /// Run the whole pipeline.
    pub fn render(&self) -> Result<RenderedPage> {
        let mut dependencies = Vec::new();
        let style = self.load_style(&mut dependencies)?;
        let (index, content) = self.read_book(&mut dependencies)?;

        let mut page = self.assemble(&index.title, &content, &style, &mut dependencies)?;
        page.dependencies = dependencies;
        Ok(page)
    }

    /// Render already concatenated chapter content under `title`.
    ///
    /// Uses the configured assets but reads no index or chapters.
    pub fn render_document(&self, title: &str, content: &str) -> Result<RenderedPage> {
        let mut dependencies = Vec::new();
        let style = self.load_style(&mut dependencies)?;

        let mut page = self.assemble(title, content, &style, &mut dependencies)?;
        page.dependencies = dependencies;
        Ok(page)
    }

    /// The numbered table of contents as a plain-text outline.
    pub fn render_toc(&self) -> Result<String> {
        let mut dependencies = Vec::new();
        let (index, content) = self.read_book(&mut dependencies)?;
        let output = self.markdown()?.render(&content);

        let mut out = String::new();
        if !index.title.is_empty() {
            out.push_str(&index.title);
            out.push_str("\n\n");
        }
        out.push_str(&toc_text(&output.headings, self.config.toc.max_level));
        Ok(out)
    }

    fn markdown(&self) -> Result<MarkdownRenderer> {
        let math = match &self.math {
            Some(math) => Arc::clone(math),
            None => Arc::new(MathMlRenderer::new(self.config.math_macros.clone())),
        };

        Ok(MarkdownRenderer::new(math)
            .with_slugger(self.config.slug.compile()?)
            .with_toc(self.config.toc))
    }

    fn load_style(&self, dependencies: &mut Vec<PathBuf>) -> Result<String> {
        match &self.config.style {
            Some(source) => source.load(&self.config.base_dir, dependencies),
            None => Ok(DEFAULT_STYLE.to_string()),
        }
    }

    fn read_book(&self, dependencies: &mut Vec<PathBuf>) -> Result<(BookIndex, String)> {
        let config = &self.config;
        let resolved = IndexResolver::new(&config.base_dir)
            .with_candidates(config.entry_candidates.clone())
            .with_extension(config.chapter_extension.as_str())
            .resolve(&config.index)?;

        dependencies.extend(resolved.entry);
        let index = resolved.index;

        let chapters = load_chapters(&index, &config.base_dir, &config.chapter_extension)?;
        dependencies.extend(chapters.iter().map(|c| c.path.clone()));
        log::info!("loaded {} chapters of \"{}\"", chapters.len(), index.title);

        let content = join_chapters(&chapters);
        Ok((index, content))
    }

    fn assemble(
        &self,
        title: &str,
        content: &str,
        style: &str,
        dependencies: &mut Vec<PathBuf>,
    ) -> Result<RenderedPage> {
        let RenderOutput {
            html: body,
            headings,
            assets,
        } = self.markdown()?.render(content);

        let diagram_script = self.optional_asset(
            assets.diagram,
            self.config.diagram_script.as_ref(),
            "diagram script",
            dependencies,
        )?;
        let math_style = self.optional_asset(
            assets.math,
            self.config.math_style.as_ref(),
            "math style sheet",
            dependencies,
        )?;

        let toc = render_toc(&headings, self.config.toc.max_level);
        let date = format_long_date(self.config.date.unwrap_or_else(today));

        let html = Shell {
            title,
            body: &body,
            toc: &toc,
            date: &date,
            diagram_script: diagram_script.as_deref(),
            watch: self.config.watch,
        }
        .render();

        let full_style = match &math_style {
            Some(math_style) => format!("{style}{math_style}"),
            None => style.to_string(),
        };
        let css = self
            .pruner
            .process(&full_style, &html, math_style.is_some())?;
        log::info!(
            "style sheet reduced from {} to {} bytes",
            full_style.len(),
            css.len()
        );

        Ok(RenderedPage {
            html: fill_style(&html, &css),
            title: title.to_string(),
            headings,
            dependencies: Vec::new(),
            assets,
        })
    }

    fn optional_asset(
        &self,
        needed: bool,
        source: Option<&AssetSource>,
        what: &str,
        dependencies: &mut Vec<PathBuf>,
    ) -> Result<Option<String>> {
        if !needed {
            return Ok(None);
        }

        match source {
            Some(source) => source.load(&self.config.base_dir, dependencies).map(Some),
            None => {
                log::warn!("page needs a {what} but none is configured");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn assembler() -> PageAssembler {
        PageAssembler::new(
            PageConfig::default()
                .with_style(AssetSource::Inline(
                    ".menu{color:red}.unused{color:blue}".into(),
                ))
                .with_date(fixed_date()),
        )
    }

    #[test]
    fn test_render_document() {
        let page = assembler()
            .render_document("Guide", "# Intro\n\nHello.\n\n## Details\n")
            .unwrap();

        assert!(page.html.contains("<title>Guide</title>"));
        assert!(page.html.contains("<style>.menu{color:red}</style>"));
        assert!(page.html.contains("<div class=\"date\">March 7, 2024</div>"));
        assert!(page.html.contains("<a href=\"#intro\">1. Intro</a>"));
        assert!(page.html.contains("<a href=\"#details\">1.1. Details</a>"));
        assert_eq!(page.headings.len(), 1);
        assert!(page.dependencies.is_empty());
    }

    #[test]
    fn test_math_style_only_when_needed() {
        let assembler = PageAssembler::new(
            PageConfig::default()
                .with_style(AssetSource::Inline("p{margin:0}".into()))
                .with_math_style(AssetSource::Inline("math{display:inline}".into()))
                .with_date(fixed_date()),
        );

        let plain = assembler.render_document("T", "Just text.").unwrap();
        assert!(!plain.assets.math);
        assert!(plain.html.contains("<style>p{margin:0}</style>"));

        let math = assembler.render_document("T", "Area: $x^2$").unwrap();
        assert!(math.assets.math);
        assert!(math.html.contains("<style>p{margin:0}math{display:inline}</style>"));
    }

    #[test]
    fn test_diagram_script_only_when_needed() {
        let assembler = PageAssembler::new(
            PageConfig::default()
                .with_diagram_script(AssetSource::Inline("var mermaid={};".into()))
                .with_date(fixed_date()),
        );

        let plain = assembler.render_document("T", "text").unwrap();
        assert!(!plain.html.contains("var mermaid={};"));

        let diagram = assembler
            .render_document("T", "```mermaid\ngraph TD; A-->B\n```\n")
            .unwrap();
        assert!(diagram.assets.diagram);
        assert!(diagram.html.contains("<script type=\"text/javascript\">var mermaid={};</script>"));
        assert!(diagram.html.contains("mermaid.initialize"));
    }

    #[test]
    fn test_missing_optional_asset_is_not_an_error() {
        let page = assembler()
            .render_document("T", "```mermaid\ngraph TD; A-->B\n```\n")
            .unwrap();
        assert!(page.assets.diagram);
        assert!(!page.html.contains("mermaid.initialize"));
    }

    #[test]
    fn test_bundled_style_is_default() {
        let page = PageAssembler::new(PageConfig::default().with_date(fixed_date()))
            .render_document("T", "# A")
            .unwrap();
        assert!(page.html.contains(".book-title{"));
        assert!(!page.html.contains(".alert.warning"));
    }

    #[test]
    fn test_config_from_json() {
        let config: PageConfig = serde_json::from_str(
            r#"{
                "base_dir": "book",
                "index": {"title": "T", "files": ["a"]},
                "style": {"file": "style.css"},
                "toc": {"max_level": 2},
                "watch": true,
                "date": "2024-03-07"
            }"#,
        )
        .unwrap();

        assert_eq!(config.base_dir, PathBuf::from("book"));
        assert_eq!(
            config.index,
            IndexSource::Explicit(BookIndex::new("T").with_file("a"))
        );
        assert_eq!(config.style, Some(AssetSource::File("style.css".into())));
        assert_eq!(config.toc.max_level, 2);
        assert!(config.watch);
        assert_eq!(config.date, Some(fixed_date()));
        assert_eq!(config.chapter_extension, "md");
        assert!(config.math_macros.contains_key(r"\label"));
    }

    #[test]
    fn test_invalid_slug_pattern() {
        let assembler = PageAssembler::new(PageConfig::default().with_slug(SlugPolicy {
            pattern: "(".into(),
            separator: "-".into(),
        }));
        assert!(matches!(
            assembler.render_document("T", "# A"),
            Err(Error::SlugPattern(_))
        ));
    }
}
