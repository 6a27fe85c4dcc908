//! Board title modes.

use std::fmt;
use std::sync::Arc;

use sidebar_core::Text;

use crate::application::content::{ContentError, FrameSource, TitleProvider, ViewerContext};

/// How a board's title is produced.
pub enum TitleSource {
    /// One text for every viewer.
    Fixed(Text),
    /// Frames advanced by the board's title task on every frame interval.
    Animated(Box<dyn FrameSource>),
    /// Computed per viewer on every objective render.
    Functional(Arc<dyn TitleProvider>),
}

impl TitleSource {
    pub fn fixed(text: impl Into<Text>) -> Self {
        TitleSource::Fixed(text.into())
    }

    pub fn animated<I>(frames: I) -> Self
    where
        I: IntoIterator<Item = Text>,
        I::IntoIter: Send + Sync + 'static,
    {
        TitleSource::Animated(Box::new(frames.into_iter()))
    }

    pub fn functional<F>(provider: F) -> Self
    where
        F: Fn(&ViewerContext) -> Result<Text, ContentError> + Send + Sync + 'static,
    {
        TitleSource::Functional(Arc::new(provider))
    }
}

impl From<&str> for TitleSource {
    fn from(s: &str) -> Self {
        TitleSource::Fixed(Text::from(s))
    }
}

impl From<Text> for TitleSource {
    fn from(text: Text) -> Self {
        TitleSource::Fixed(text)
    }
}

impl fmt::Debug for TitleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleSource::Fixed(text) => f.debug_tuple("Fixed").field(text).finish(),
            TitleSource::Animated(_) => f.write_str("Animated(..)"),
            TitleSource::Functional(_) => f.write_str("Functional(..)"),
        }
    }
}

/// The title a board currently renders.
pub(crate) enum TitleState {
    Fixed(Text),
    Animated {
        frames: Box<dyn FrameSource>,
        current: Text,
    },
    Functional(Arc<dyn TitleProvider>),
}

impl TitleState {
    /// Builds the state for `source`, pulling the first animation frame.
    pub(crate) fn from_source(source: TitleSource) -> Self {
        match source {
            TitleSource::Fixed(text) => TitleState::Fixed(text),
            TitleSource::Animated(mut frames) => {
                let current = frames.next_frame().unwrap_or_else(Text::empty);
                TitleState::Animated { frames, current }
            }
            TitleSource::Functional(provider) => TitleState::Functional(provider),
        }
    }

    pub(crate) fn is_animated(&self) -> bool {
        matches!(self, TitleState::Animated { .. })
    }

    /// Moves an animated title to its next frame.  Returns `false` when the
    /// title is not animated or the frames ran out.
    pub(crate) fn advance(&mut self) -> bool {
        match self {
            TitleState::Animated { frames, current } => match frames.next_frame() {
                Some(next) => {
                    *current = next;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    pub(crate) fn resolve(&self, ctx: &ViewerContext) -> Result<Text, ContentError> {
        match self {
            TitleState::Fixed(text) => Ok(text.clone()),
            TitleState::Animated { current, .. } => Ok(current.clone()),
            TitleState::Functional(provider) => provider.title(ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sidebar_core::ProtocolVersion;
    use uuid::Uuid;

    fn ctx() -> ViewerContext {
        ViewerContext {
            viewer: Uuid::new_v4(),
            protocol_version: ProtocolVersion::MINECRAFT_1_8,
        }
    }

    #[test]
    fn test_animated_title_starts_on_first_frame() {
        let state = TitleState::from_source(TitleSource::animated(vec![
            Text::plain("A"),
            Text::plain("B"),
        ]));
        assert!(state.is_animated());
        assert_eq!(state.resolve(&ctx()).unwrap(), Text::plain("A"));
    }

    #[test]
    fn test_advance_walks_frames_then_stops() {
        let mut state = TitleState::from_source(TitleSource::animated(vec![
            Text::plain("A"),
            Text::plain("B"),
        ]));

        assert!(state.advance());
        assert_eq!(state.resolve(&ctx()).unwrap(), Text::plain("B"));
        assert!(!state.advance());
        assert_eq!(state.resolve(&ctx()).unwrap(), Text::plain("B"));
    }

    #[test]
    fn test_functional_title_sees_viewer_version() {
        let state = TitleState::from_source(TitleSource::functional(|ctx: &ViewerContext| {
            Ok(Text::plain(format!("v{}", ctx.protocol_version.0)))
        }));
        assert_eq!(state.resolve(&ctx()).unwrap(), Text::plain("v47"));
    }

    #[test]
    fn test_fixed_title_does_not_advance() {
        let mut state = TitleState::from_source("Stats".into());
        assert!(!state.advance());
        assert!(!state.is_animated());
    }
}
