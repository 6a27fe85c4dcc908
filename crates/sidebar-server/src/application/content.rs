//! Per-viewer content providers.
//!
//! Dynamic lines, visibility conditions, functional titles and number formats
//! are all user code evaluated once per viewer per render pass.  Each is a
//! small trait with a blanket implementation for closures, so callers can
//! pass `|ctx: &ViewerContext| Ok(Text::plain(...))` directly.
//!
//! A provider reports failure with a [`ContentError`].  The engine never lets
//! such a failure escape the render pass unwrapped: it is attached to the
//! viewer and board it happened for (see
//! [`crate::application::error::BoardError::Content`]).

use std::fmt;
use std::sync::Arc;

use sidebar_core::protocol::packets::NumberFormat;
use sidebar_core::{ProtocolVersion, Text, TextRenderer, ViewerId};
use thiserror::Error;

use crate::application::tasks::TaskHandle;

/// What a provider knows about the viewer it renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewerContext {
    pub viewer: ViewerId,
    pub protocol_version: ProtocolVersion,
}

/// A content, visibility or title provider failed for one viewer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ContentError(pub String);

impl ContentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ── Provider traits ───────────────────────────────────────────────────────────

/// Produces the text of a dynamic line.
pub trait LineContent: Send + Sync {
    fn render(&self, ctx: &ViewerContext) -> Result<Text, ContentError>;
}

impl<F> LineContent for F
where
    F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync,
{
    fn render(&self, ctx: &ViewerContext) -> Result<Text, ContentError> {
        self(ctx)
    }
}

/// Decides whether a line is shown to a viewer.
pub trait Visibility: Send + Sync {
    fn is_visible(&self, ctx: &ViewerContext) -> Result<bool, ContentError>;
}

impl<F> Visibility for F
where
    F: Fn(&ViewerContext) -> Result<bool, ContentError> + Send + Sync,
{
    fn is_visible(&self, ctx: &ViewerContext) -> Result<bool, ContentError> {
        self(ctx)
    }
}

/// Default predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn is_visible(&self, _ctx: &ViewerContext) -> Result<bool, ContentError> {
        Ok(true)
    }
}

/// Produces a title per viewer.
pub trait TitleProvider: Send + Sync {
    fn title(&self, ctx: &ViewerContext) -> Result<Text, ContentError>;
}

impl<F> TitleProvider for F
where
    F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync,
{
    fn title(&self, ctx: &ViewerContext) -> Result<Text, ContentError> {
        self(ctx)
    }
}

/// Successive frames of an animated title; `None` ends the animation on the
/// last frame shown.
pub trait FrameSource: Send + Sync {
    fn next_frame(&mut self) -> Option<Text>;
}

impl<I> FrameSource for I
where
    I: Iterator<Item = Text> + Send + Sync,
{
    fn next_frame(&mut self) -> Option<Text> {
        self.next()
    }
}

// ── Number formats ────────────────────────────────────────────────────────────

/// Number format for the objective or a single line, resolved per viewer.
#[derive(Clone)]
pub enum ScoreFormat {
    /// Hide the number.
    Blank,
    /// Replace the number with text.
    Fixed(Arc<dyn LineContent>),
    /// Keep the number, styled by a JSON style object such as
    /// `{"color":"red"}` passed as [`Text::Json`].
    Styled(Arc<dyn LineContent>),
}

impl ScoreFormat {
    pub fn fixed<F>(provider: F) -> Self
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
    {
        ScoreFormat::Fixed(Arc::new(provider))
    }

    pub fn styled<F>(provider: F) -> Self
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
    {
        ScoreFormat::Styled(Arc::new(provider))
    }

    pub(crate) fn resolve(
        &self,
        ctx: &ViewerContext,
        renderer: &dyn TextRenderer,
    ) -> Result<NumberFormat, ContentError> {
        Ok(match self {
            ScoreFormat::Blank => NumberFormat::Blank,
            ScoreFormat::Fixed(p) => NumberFormat::Fixed(renderer.render(ctx.viewer, &p.render(ctx)?).json),
            ScoreFormat::Styled(p) => NumberFormat::Styled(renderer.render(ctx.viewer, &p.render(ctx)?).json),
        })
    }
}

impl fmt::Debug for ScoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreFormat::Blank => f.write_str("Blank"),
            ScoreFormat::Fixed(_) => f.write_str("Fixed(..)"),
            ScoreFormat::Styled(_) => f.write_str("Styled(..)"),
        }
    }
}

pub(crate) fn resolve_format(
    format: Option<&ScoreFormat>,
    ctx: &ViewerContext,
    renderer: &dyn TextRenderer,
) -> Result<Option<NumberFormat>, ContentError> {
    format.map(|f| f.resolve(ctx, renderer)).transpose()
}

// ── Line state ────────────────────────────────────────────────────────────────

/// Where a line's text comes from.
#[derive(Clone)]
pub enum LineSource {
    Static(Text),
    Dynamic(Arc<dyn LineContent>),
}

/// Everything the engine stores about one line besides slot and score.
pub(crate) struct LineSpec {
    pub(crate) source: LineSource,
    pub(crate) visibility: Arc<dyn Visibility>,
    pub(crate) score_format: Option<ScoreFormat>,
    pub(crate) refresh: Option<TaskHandle>,
}

impl LineSpec {
    pub(crate) fn new(source: LineSource, visibility: Arc<dyn Visibility>) -> Self {
        Self {
            source,
            visibility,
            score_format: None,
            refresh: None,
        }
    }

    pub(crate) fn is_static(&self) -> bool {
        matches!(self.source, LineSource::Static(_))
    }

    /// `true` while the line's own periodic refresh owns its rendering.
    pub(crate) fn refresh_active(&self) -> bool {
        self.refresh.as_ref().is_some_and(TaskHandle::is_active)
    }

    pub(crate) fn text(&self, ctx: &ViewerContext) -> Result<Text, ContentError> {
        match &self.source {
            LineSource::Static(text) => Ok(text.clone()),
            LineSource::Dynamic(provider) => provider.render(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidebar_core::DefaultTextRenderer;
    use uuid::Uuid;

    fn ctx() -> ViewerContext {
        ViewerContext {
            viewer: Uuid::new_v4(),
            protocol_version: ProtocolVersion::MINECRAFT_1_20_3,
        }
    }

    #[test]
    fn test_closure_is_line_content() {
        let provider: Arc<dyn LineContent> =
            Arc::new(|ctx: &ViewerContext| Ok(Text::plain(format!("v{}", ctx.protocol_version.0))));
        assert_eq!(provider.render(&ctx()).unwrap(), Text::plain("v765"));
    }

    #[test]
    fn test_iterator_is_frame_source() {
        let mut frames: Box<dyn FrameSource> =
            Box::new(vec![Text::plain("a"), Text::plain("b")].into_iter());
        assert_eq!(frames.next_frame(), Some(Text::plain("a")));
        assert_eq!(frames.next_frame(), Some(Text::plain("b")));
        assert_eq!(frames.next_frame(), None);
    }

    #[test]
    fn test_fixed_format_resolves_to_json_component() {
        let format = ScoreFormat::fixed(|_: &ViewerContext| Ok(Text::plain("12 pts")));
        let resolved = format.resolve(&ctx(), &DefaultTextRenderer).unwrap();
        assert_eq!(resolved, NumberFormat::Fixed(r#"{"text":"12 pts"}"#.to_string()));
    }

    #[test]
    fn test_static_line_text_ignores_viewer() {
        let spec = LineSpec::new(LineSource::Static(Text::plain("Kills: 5")), Arc::new(AlwaysVisible));
        assert!(spec.is_static());
        assert!(!spec.refresh_active());
        assert_eq!(spec.text(&ctx()).unwrap(), Text::plain("Kills: 5"));
    }

    #[test]
    fn test_failing_visibility_reports_error() {
        let predicate: Arc<dyn Visibility> =
            Arc::new(|_: &ViewerContext| Err(ContentError::new("no profile loaded")));
        assert_eq!(
            predicate.is_visible(&ctx()).unwrap_err().to_string(),
            "no profile loaded"
        );
    }
}
