//! Per-compile engine state.
//!
//! [`EngineState`] is created by [`Engine::compile`](crate::Engine::compile)
//! for one page and threaded through every handler. It is exclusively owned by
//! that compile and dropped when the [`CompileResult`](crate::CompileResult) is
//! built.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use crate::{CompileError, EngineConfiguration, FunctionRegistry, Instruction, PageRef};

/// Page-level flag set by an instruction function such as `@@Draft`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PageFlag {
    /// `@@NoCache`: the rendered page must not be cached.
    NoCache,
    /// `@@Draft`: the page is a draft.
    Draft,
    /// `@@Deprecate`: the page is deprecated.
    Deprecate,
    /// `@@Protect`: only privileged users may edit.
    Protect,
    /// `@@Template`: the page is a template for new pages.
    Template,
    /// `@@Review`: the page needs review.
    Review,
}

impl PageFlag {
    /// All flags, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::NoCache,
        Self::Draft,
        Self::Deprecate,
        Self::Protect,
        Self::Template,
        Self::Review,
    ];

    /// Name of the instruction function that sets this flag.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoCache => "NoCache",
            Self::Draft => "Draft",
            Self::Deprecate => "Deprecate",
            Self::Protect => "Protect",
            Self::Template => "Template",
            Self::Review => "Review",
        }
    }
}

impl fmt::Display for PageFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutable context of one compile.
///
/// Handlers read the configuration and page through it and record their side
/// effects (links, tags, flags, snippets, diagnostics) on it. Counters are
/// maintained by the driver.
pub struct EngineState<'a> {
    /// Configuration snapshot.
    pub config: &'a EngineConfiguration,
    /// Page being compiled.
    pub page: &'a PageRef,
    pub(crate) registry: &'a FunctionRegistry,
    pub(crate) html_result: String,
    pub(crate) match_count: usize,
    pub(crate) error_count: usize,
    pub(crate) constructs_identified: usize,
    pub(crate) outgoing_links: BTreeSet<String>,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) flags: BTreeSet<PageFlag>,
    pub(crate) snippets: HashMap<String, String>,
    pub(crate) processing_time: Option<Duration>,
    pub(crate) processing_instructions: Vec<Instruction>,
    pub(crate) diagnostics: Vec<CompileError>,
}

impl<'a> EngineState<'a> {
    pub(crate) fn new(
        config: &'a EngineConfiguration,
        page: &'a PageRef,
        registry: &'a FunctionRegistry,
    ) -> Self {
        Self {
            config,
            page,
            registry,
            html_result: String::with_capacity(page.body.len()),
            match_count: 0,
            error_count: 0,
            constructs_identified: 0,
            outgoing_links: BTreeSet::new(),
            tags: BTreeSet::new(),
            flags: BTreeSet::new(),
            snippets: HashMap::new(),
            processing_time: None,
            processing_instructions: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Top-level HTML generated so far.
    ///
    /// Output of an enclosing scoped body joins it only once that body is
    /// complete.
    #[must_use]
    pub fn html_result(&self) -> &str {
        &self.html_result
    }

    /// Constructs handled successfully so far.
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.match_count
    }

    /// Constructs that fell back to literal text so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Constructs identified so far, excluding declined ones.
    #[must_use]
    pub fn constructs_identified(&self) -> usize {
        self.constructs_identified
    }

    /// Elapsed compile time; set just before the completion handler runs.
    #[must_use]
    pub fn processing_time(&self) -> Option<Duration> {
        self.processing_time
    }

    /// Instructions pending on the scopes currently being prepared.
    #[must_use]
    pub fn processing_instructions(&self) -> &[Instruction] {
        &self.processing_instructions
    }

    /// Recovered errors so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[CompileError] {
        &self.diagnostics
    }

    /// Navigations of pages linked so far.
    #[must_use]
    pub fn outgoing_links(&self) -> &BTreeSet<String> {
        &self.outgoing_links
    }

    /// Record a link to another page by navigation.
    pub fn add_outgoing_link(&mut self, navigation: impl Into<String>) {
        self.outgoing_links.insert(navigation.into());
    }

    /// Tags set so far.
    #[must_use]
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Add a tag; it is trimmed and lowercased, empty tags are ignored.
    pub fn add_tag(&mut self, tag: &str) {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() {
            self.tags.insert(tag);
        }
    }

    /// Flags set so far.
    #[must_use]
    pub fn flags(&self) -> &BTreeSet<PageFlag> {
        &self.flags
    }

    /// Set a page flag.
    pub fn set_flag(&mut self, flag: PageFlag) {
        self.flags.insert(flag);
    }

    /// Define (or redefine) a named snippet.
    pub fn define_snippet(&mut self, name: &str, body: impl Into<String>) {
        self.snippets.insert(name.to_lowercase(), body.into());
    }

    /// Look up a snippet by name (case-insensitive).
    #[must_use]
    pub fn snippet(&self, name: &str) -> Option<&str> {
        self.snippets.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Report a recovered error for the construct being handled.
    ///
    /// The driver counts the construct as an error if its handler reported
    /// anything, even when the handler still returns text.
    pub fn report(&mut self, error: CompileError) {
        tracing::debug!(error = %error, "Construct error reported by handler");
        self.diagnostics.push(error);
    }
}

impl fmt::Debug for EngineState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineState")
            .field("page_id", &self.page.id)
            .field("match_count", &self.match_count)
            .field("error_count", &self.error_count)
            .field("constructs_identified", &self.constructs_identified)
            .field("outgoing_links", &self.outgoing_links)
            .field("tags", &self.tags)
            .field("flags", &self.flags)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}
