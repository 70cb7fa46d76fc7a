//! The wizard state machine: one active step, one editable model, and the
//! two gateway round-trips (load on entry, save on finish).

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::form::model::{CertificationPatch, EditError, EducationPatch, ExperiencePatch};
use crate::form::rules::RuleContext;
use crate::form::{EntryId, FieldEdit, FieldPath, GroupKind, ResumeFormModel};
use crate::gateway::{GatewayError, ResumePersistenceGateway};
use crate::notify::{Notification, Notifier};
use crate::wizard::steps::{validate_step, Step, StepErrors};

pub const FETCH_FAILED: &str = "Failed to fetch resume";
pub const SAVE_FAILED: &str = "Failed to save resume";
pub const CREATED: &str = "Resume created successfully";
pub const UPDATED: &str = "Resume updated successfully";
const ERROR_TITLE: &str = "Unexpected Error";

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("{message}")]
    Load {
        message: String,
        #[source]
        source: GatewayError,
    },

    #[error("{message}")]
    Submit {
        message: String,
        #[source]
        source: GatewayError,
    },

    #[error("Another request for this resume is still in progress")]
    InFlight,

    #[error("This wizard session has already been submitted")]
    SessionFinished,

    #[error(transparent)]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Create,
    Edit(String),
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Create => "create",
            Mode::Edit(_) => "edit",
        }
    }
}

/// Which fields `submit` re-validates before saving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitValidation {
    /// Only the active step's field set, as `next` does.
    #[default]
    ActiveStep,
    /// Every step; failures elsewhere block the save without moving the step.
    FullDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    Advanced { from: Step, to: Step },
    /// The active step has field errors; see [`WizardController::errors`].
    Blocked,
    /// Already on the last step; nothing to advance to.
    LastStep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Saved { id: String },
    Blocked,
}

/// A new repeating-group entry, seeded from a partial value.
#[derive(Debug, Clone)]
pub enum NewEntry {
    Experience(ExperiencePatch),
    Education(EducationPatch),
    Certification(CertificationPatch),
}

impl NewEntry {
    /// Reads a partial entry for `group` from a JSON object. `null` is an
    /// empty entry.
    pub fn from_json(group: GroupKind, value: Value) -> Result<Self, serde_json::Error> {
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };
        Ok(match group {
            GroupKind::Experience => NewEntry::Experience(serde_json::from_value(value)?),
            GroupKind::Education => NewEntry::Education(serde_json::from_value(value)?),
            GroupKind::Certifications => NewEntry::Certification(serde_json::from_value(value)?),
        })
    }

    pub fn group(&self) -> GroupKind {
        match self {
            NewEntry::Experience(_) => GroupKind::Experience,
            NewEntry::Education(_) => GroupKind::Education,
            NewEntry::Certification(_) => GroupKind::Certifications,
        }
    }
}

#[derive(Debug)]
pub struct WizardController {
    active: Step,
    model: ResumeFormModel,
    mode: Mode,
    errors: StepErrors,
    last_error: Option<String>,
    finished: bool,
    ctx: RuleContext,
    submit_validation: SubmitValidation,
}

impl WizardController {
    /// A blank create-mode wizard on the first step.
    pub fn create() -> Self {
        Self::with_mode(Mode::Create)
    }

    /// An edit-mode wizard for `resume_id`. The model stays at its defaults
    /// until [`load`](Self::load) has completed.
    pub fn edit(resume_id: impl Into<String>) -> Self {
        Self::with_mode(Mode::Edit(resume_id.into()))
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            active: Step::FIRST,
            model: ResumeFormModel::default(),
            mode,
            errors: StepErrors::default(),
            last_error: None,
            finished: false,
            ctx: RuleContext::today(),
            submit_validation: SubmitValidation::default(),
        }
    }

    pub fn with_rule_context(mut self, ctx: RuleContext) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn with_submit_validation(mut self, policy: SubmitValidation) -> Self {
        self.submit_validation = policy;
        self
    }

    pub fn active_step(&self) -> Step {
        self.active
    }

    pub fn model(&self) -> &ResumeFormModel {
        &self.model
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn resume_id(&self) -> Option<&str> {
        match &self.mode {
            Mode::Create => None,
            Mode::Edit(id) => Some(id),
        }
    }

    pub fn errors(&self) -> &StepErrors {
        &self.errors
    }

    /// The last load or submit failure, kept until the next attempt.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Fetches the résumé being edited and replaces the model with it.
    ///
    /// On failure the message is surfaced and the wizard falls back to a
    /// blank create flow, so a later submit cannot overwrite the stored
    /// résumé with empty data. Does nothing in create mode.
    pub async fn load(
        &mut self,
        gateway: &dyn ResumePersistenceGateway,
        notifier: &dyn Notifier,
    ) -> Result<(), WizardError> {
        let Mode::Edit(id) = &self.mode else {
            return Ok(());
        };
        let id = id.clone();

        match gateway.fetch_by_id(&id).await {
            Ok(doc) => {
                self.model = ResumeFormModel::from_wire(&doc);
                self.last_error = None;
                info!("Loaded resume {id} into wizard");
                Ok(())
            }
            Err(source) => {
                let message = source.remote_message().unwrap_or(FETCH_FAILED).to_string();
                warn!("Loading resume {id} failed: {source}");
                notifier.notify(Notification::error(ERROR_TITLE, message.clone()));
                self.model = ResumeFormModel::default();
                self.mode = Mode::Create;
                self.last_error = Some(message.clone());
                Err(WizardError::Load { message, source })
            }
        }
    }

    /// Validates the active step and moves forward when it is clean.
    pub fn next(&mut self) -> Result<NextOutcome, WizardError> {
        self.ensure_open()?;
        let errors = validate_step(self.active, &mut self.model, &self.ctx);
        if !errors.is_empty() {
            debug!(
                "Step {:?} blocked with {} field error(s)",
                self.active,
                errors.len()
            );
            self.errors = errors;
            return Ok(NextOutcome::Blocked);
        }

        self.errors.clear();
        match self.active.next() {
            Some(to) => {
                let from = self.active;
                self.active = to;
                debug!("Wizard advanced {from:?} -> {to:?}");
                Ok(NextOutcome::Advanced { from, to })
            }
            None => Ok(NextOutcome::LastStep),
        }
    }

    /// Moves one step back without validating; stays put on the first step.
    pub fn back(&mut self) -> Step {
        if let Some(prev) = self.active.prev() {
            debug!("Wizard moved back {:?} -> {prev:?}", self.active);
            self.active = prev;
        }
        self.active
    }

    /// Validates and saves the résumé. A successful save ends the session.
    ///
    /// A failed save keeps the step and every entered value; the message is
    /// surfaced through `last_error` and the notifier.
    pub async fn submit(
        &mut self,
        gateway: &dyn ResumePersistenceGateway,
        notifier: &dyn Notifier,
    ) -> Result<SubmitOutcome, WizardError> {
        self.ensure_open()?;

        let errors = self.submit_errors();
        if !errors.is_empty() {
            debug!("Submit blocked with {} field error(s)", errors.len());
            self.errors = errors;
            return Ok(SubmitOutcome::Blocked);
        }
        self.errors.clear();

        let doc = self.model.to_wire();
        let saved = match &self.mode {
            Mode::Create => gateway.create(&doc).await.map(|id| (id, CREATED)),
            Mode::Edit(id) => gateway
                .update(id, &doc)
                .await
                .map(|()| (id.clone(), UPDATED)),
        };

        match saved {
            Ok((id, message)) => {
                info!("Wizard saved resume {id}");
                notifier.notify(Notification::success(message));
                self.mode = Mode::Edit(id.clone());
                self.last_error = None;
                self.finished = true;
                Ok(SubmitOutcome::Saved { id })
            }
            Err(source) => {
                let message = source.remote_message().unwrap_or(SAVE_FAILED).to_string();
                warn!("Saving resume failed: {source}");
                notifier.notify(Notification::error(ERROR_TITLE, message.clone()));
                self.last_error = Some(message.clone());
                Err(WizardError::Submit { message, source })
            }
        }
    }

    fn submit_errors(&mut self) -> StepErrors {
        let mut errors = validate_step(self.active, &mut self.model, &self.ctx);
        if self.submit_validation == SubmitValidation::FullDocument {
            for step in Step::ALL.into_iter().filter(|&s| s != self.active) {
                errors.merge(validate_step(step, &mut self.model, &self.ctx));
            }
        }
        errors
    }

    /// Applies one field edit and drops that field's surfaced error.
    pub fn edit_field(&mut self, edit: FieldEdit) -> Result<(), WizardError> {
        self.ensure_open()?;
        let path = edit.path;
        self.model.apply(edit)?;
        self.errors.clear_field(&path);
        Ok(())
    }

    pub fn append_entry(&mut self, entry: NewEntry) -> Result<EntryId, WizardError> {
        self.ensure_open()?;
        let group = entry.group();
        let id = match entry {
            NewEntry::Experience(patch) => self.model.experience.append(patch),
            NewEntry::Education(patch) => self.model.education.append(patch),
            NewEntry::Certification(patch) => self.model.certifications.append(patch),
        };
        self.errors.clear_field(&FieldPath::Group(group));
        debug!("Appended {group} entry {id}");
        Ok(id)
    }

    /// Removes an entry. Returns `false` when the id is unknown or the group
    /// must keep its last entry.
    pub fn remove_entry(&mut self, group: GroupKind, id: EntryId) -> Result<bool, WizardError> {
        self.ensure_open()?;
        let removed = match group {
            GroupKind::Experience => self.model.experience.remove(id),
            GroupKind::Education => self.model.education.remove(id),
            GroupKind::Certifications => self.model.certifications.remove(id),
        };
        if removed {
            self.errors.clear_entry(group, id);
            debug!("Removed {group} entry {id}");
        }
        Ok(removed)
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        if self.finished {
            return Err(WizardError::SessionFinished);
        }
        Ok(())
    }
}
