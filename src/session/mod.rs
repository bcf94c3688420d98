// Session module
// Tracks one image from upload to saved description


use std::fmt;
use std::mem;

use thiserror::Error;
use tracing::{debug, info};

use crate::Result;
use crate::database::PointId;
use crate::describe::Describer;
use crate::ingest::DescriptionStore;
use crate::upload::UploadedImage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: StateKind, action: Action },

    #[error("Description is empty, nothing to save")]
    EmptyDescription,
}

/// The user-visible actions of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Generate,
    Edit,
    Save,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Generate => write!(f, "generate a description"),
            Action::Edit => write!(f, "edit the description"),
            Action::Save => write!(f, "save the description"),
        }
    }
}

/// Discriminant of [`SessionState`], used in errors and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    ImageLoaded,
    DescriptionGenerated,
    DescriptionEdited,
    Saved,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKind::Idle => write!(f, "no image is loaded"),
            StateKind::ImageLoaded => write!(f, "no description has been generated"),
            StateKind::DescriptionGenerated => write!(f, "the description is freshly generated"),
            StateKind::DescriptionEdited => write!(f, "the description is being edited"),
            StateKind::Saved => write!(f, "the description is already saved"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Idle,
    ImageLoaded {
        image: UploadedImage,
    },
    DescriptionGenerated {
        image: UploadedImage,
        text: String,
    },
    DescriptionEdited {
        image: UploadedImage,
        text: String,
    },
    Saved {
        image: UploadedImage,
        text: String,
        id: PointId,
    },
}

impl SessionState {
    #[inline]
    pub fn kind(&self) -> StateKind {
        match self {
            SessionState::Idle => StateKind::Idle,
            SessionState::ImageLoaded { .. } => StateKind::ImageLoaded,
            SessionState::DescriptionGenerated { .. } => StateKind::DescriptionGenerated,
            SessionState::DescriptionEdited { .. } => StateKind::DescriptionEdited,
            SessionState::Saved { .. } => StateKind::Saved,
        }
    }

    #[inline]
    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            SessionState::Idle => None,
            SessionState::ImageLoaded { image }
            | SessionState::DescriptionGenerated { image, .. }
            | SessionState::DescriptionEdited { image, .. }
            | SessionState::Saved { image, .. } => Some(image),
        }
    }

    #[inline]
    pub fn text(&self) -> Option<&str> {
        match self {
            SessionState::Idle | SessionState::ImageLoaded { .. } => None,
            SessionState::DescriptionGenerated { text, .. }
            | SessionState::DescriptionEdited { text, .. }
            | SessionState::Saved { text, .. } => Some(text),
        }
    }
}

/// Holds the current image and its description between user actions.
///
/// Every action either moves to the next state or returns
/// [`SessionError::InvalidTransition`] and leaves the state untouched.
#[derive(Debug, Default)]
pub struct Session {
    state: SessionState,
}

impl Session {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Replaces whatever the session held with a fresh image
    #[inline]
    pub fn load_image(&mut self, image: UploadedImage) {
        debug!("Session: {:?} -> ImageLoaded", self.state.kind());
        self.state = SessionState::ImageLoaded { image };
    }

    /// Drafts a description for the loaded image. Any state holding an image
    /// may regenerate; on failure the state is unchanged.
    #[inline]
    pub fn generate(&mut self, describer: &Describer<'_>) -> Result<&str> {
        let Some(image) = self.state.image() else {
            return Err(self.invalid(Action::Generate));
        };

        let text = describer.generate_description(&image.bytes)?;
        let image = image.clone();
        self.state = SessionState::DescriptionGenerated { image, text };
        Ok(self.state.text().unwrap_or_default())
    }

    /// Replaces the description text with the user's edit
    #[inline]
    pub fn edit(&mut self, text: impl Into<String>) -> Result<()> {
        match mem::take(&mut self.state) {
            SessionState::DescriptionGenerated { image, .. }
            | SessionState::DescriptionEdited { image, .. }
            | SessionState::Saved { image, .. } => {
                self.state = SessionState::DescriptionEdited {
                    image,
                    text: text.into(),
                };
                Ok(())
            }
            other => {
                self.state = other;
                Err(self.invalid(Action::Edit))
            }
        }
    }

    #[inline]
    pub fn can_save(&self) -> bool {
        match &self.state {
            SessionState::DescriptionGenerated { text, .. }
            | SessionState::DescriptionEdited { text, .. } => !text.trim().is_empty(),
            _ => false,
        }
    }

    /// Stores the current description. Returns the id of the new point.
    #[inline]
    pub fn save(&mut self, store: &DescriptionStore<'_>) -> Result<PointId> {
        let (image, text) = match &self.state {
            SessionState::DescriptionGenerated { image, text }
            | SessionState::DescriptionEdited { image, text } => (image, text),
            _ => return Err(self.invalid(Action::Save)),
        };

        if text.trim().is_empty() {
            return Err(SessionError::EmptyDescription.into());
        }

        let id = store.save(text)?;
        info!("Saved description of {} as {}", image.file_name, id);

        self.state = SessionState::Saved {
            image: image.clone(),
            text: text.clone(),
            id,
        };
        Ok(id)
    }

    fn invalid(&self, action: Action) -> crate::DescriptionsError {
        SessionError::InvalidTransition {
            from: self.state.kind(),
            action,
        }
        .into()
    }
}
