use uuid::Uuid;

use super::attach::{self, AttachPolicy, AttachmentOutcome};
use super::state::FlowState;
use crate::api::{ApiClient, CreatedRequest, HttpClient, NewRequest, RequestId};
use crate::config::Config;
use crate::error::{FlowError, Step};
use crate::form::RequestForm;
use crate::presenter::Presenter;
use crate::share::{ShareOverlay, customer_url, expiry_date};
use crate::telemetry::metrics::REQUESTS_CREATED;

#[derive(Debug, Clone)]
pub struct FlowSettings {
    pub public_origin: String,
    pub attach_policy: AttachPolicy,
    pub default_expires_days: i64,
}

impl From<&Config> for FlowSettings {
    fn from(config: &Config) -> Self {
        Self {
            public_origin: config.public_origin.clone(),
            attach_policy: config.attach_policy,
            default_expires_days: config.default_expires_days,
        }
    }
}

/// What a successful submission produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request: CreatedRequest,
    pub attached: Vec<String>,
    pub share_url: String,
}

/// Drives the request form: loads modules, creates the request, attaches the
/// selected modules and presents the customer link.
///
/// Every failure is shown through the presenter before it is returned, and
/// leaves the form usable.
pub struct RequestSubmissionFlow<H, P> {
    api: ApiClient<H>,
    presenter: P,
    form: RequestForm,
    settings: FlowSettings,
    state: FlowState,
    overlay: Option<ShareOverlay>,
}

impl<H: HttpClient, P: Presenter> RequestSubmissionFlow<H, P> {
    pub fn new(api: ApiClient<H>, presenter: P, settings: FlowSettings) -> Self {
        Self {
            api,
            presenter,
            form: RequestForm::new(settings.default_expires_days),
            settings,
            state: FlowState::Idle,
            overlay: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn form(&self) -> &RequestForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut RequestForm {
        &mut self.form
    }

    pub fn overlay(&self) -> Option<&ShareOverlay> {
        self.overlay.as_ref()
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn api(&self) -> &ApiClient<H> {
        &self.api
    }

    /// Entry point: renders the module list for the first time.
    pub async fn initialize(&mut self) -> Result<Vec<String>, FlowError> {
        tracing::info!(
            attach_policy = %self.settings.attach_policy,
            public_origin = %self.settings.public_origin,
            "Initializing request form"
        );
        self.list_modules().await
    }

    /// Fetches the module names and re-renders the list from scratch.
    #[tracing::instrument(name = "flow list_modules", skip(self))]
    pub async fn list_modules(&mut self) -> Result<Vec<String>, FlowError> {
        self.transition(FlowState::ModulesLoading);

        match self.api.list_modules().await {
            Ok(modules) => {
                self.form.modules.clear();
                for kind in &modules {
                    self.form.modules.append(kind);
                }
                self.presenter.show_modules(&self.form.modules);
                self.transition(FlowState::ModulesLoaded);
                Ok(modules)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    #[tracing::instrument(name = "flow submit_request", skip(self, nickname))]
    pub async fn submit_request(
        &mut self,
        nickname: &str,
        expires_days: i64,
    ) -> Result<CreatedRequest, FlowError> {
        if !self.state.can_submit() || self.overlay.is_some() {
            return Err(self.reject("submit"));
        }
        self.transition(FlowState::Submitting);

        let new = NewRequest {
            nickname: nickname.to_string(),
            expires_days,
        };
        match self.api.create_request(&new).await {
            Ok(created) => {
                REQUESTS_CREATED.add(1, &[]);
                tracing::info!(request.id = %created.id, "Request created");
                self.transition(FlowState::RequestCreated);
                Ok(created)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Attaches `kinds` to an existing request using the configured policy.
    /// Per-module failures are returned in the outcomes, not as an error.
    pub async fn attach_modules(
        &mut self,
        request_id: &RequestId,
        kinds: &[String],
    ) -> Vec<AttachmentOutcome> {
        self.transition(FlowState::AttachingModules);

        let outcomes =
            attach::attach_modules(&self.api, request_id, kinds, self.settings.attach_policy)
                .await;

        if outcomes.iter().all(AttachmentOutcome::is_attached) {
            self.transition(FlowState::RequestCreated);
        } else {
            self.transition(FlowState::Failed(Step::Attachment));
        }
        outcomes
    }

    /// Opens the share overlay for `token`.
    pub fn present_shareable_link(
        &mut self,
        request_id: &RequestId,
        token: &str,
        expires_days: i64,
    ) -> Result<&ShareOverlay, FlowError> {
        let url = match customer_url(&self.settings.public_origin, token) {
            Ok(url) => url,
            Err(err) => return Err(self.fail(err)),
        };
        let expires_on = expiry_date(chrono::Utc::now().date_naive(), expires_days);

        let overlay = ShareOverlay::new(url, request_id.as_str(), expires_on);
        self.presenter.show_share_overlay(&overlay);
        if self.state == FlowState::RequestCreated {
            self.transition(FlowState::Complete);
        }
        Ok(self.overlay.insert(overlay))
    }

    /// The form's submit handler: create, attach, present.
    ///
    /// When some attachments fail the overlay is still shown, so the request
    /// is not lost, and `PartialAttachment` names every module to re-add.
    #[tracing::instrument(
        name = "flow submit_form",
        skip(self),
        fields(submission.id = %Uuid::new_v4(), request.id, modules.selected)
    )]
    pub async fn submit_form(&mut self) -> Result<Submission, FlowError> {
        let submission = self.form.submission();
        tracing::Span::current().record("modules.selected", submission.modules.len());

        // Nothing is created unless a link can be shown for it.
        if let Err(err) = customer_url(&self.settings.public_origin, "") {
            return Err(self.fail(err));
        }

        let created = self
            .submit_request(&submission.nickname, submission.expires_days)
            .await?;
        tracing::Span::current().record("request.id", created.id.as_str());

        let outcomes = self.attach_modules(&created.id, &submission.modules).await;
        let failures = attach::failures(&outcomes);

        let share_url = self
            .present_shareable_link(&created.id, &created.token, submission.expires_days)?
            .url()
            .to_string();

        if !failures.is_empty() {
            let err = FlowError::PartialAttachment {
                request_id: created.id.to_string(),
                token: created.token.clone(),
                failures,
            };
            return Err(self.fail(err));
        }

        Ok(Submission {
            attached: outcomes.into_iter().map(|o| o.kind).collect(),
            request: created,
            share_url,
        })
    }

    /// The overlay's Done action: close it, reset the form and reload the
    /// module list.
    pub async fn finish(&mut self) -> Result<Vec<String>, FlowError> {
        if self.overlay.take().is_none() {
            return Err(self.reject("finish"));
        }
        self.presenter.close_share_overlay();
        self.form.reset();
        self.form.modules.clear();
        self.list_modules().await
    }

    fn transition(&mut self, next: FlowState) {
        if self.state.is_busy() && matches!(next, FlowState::ModulesLoading | FlowState::Submitting)
        {
            tracing::warn!(from = %self.state, to = %next, "previous operation was interrupted");
        } else {
            tracing::debug!(from = %self.state, to = %next, "flow state changed");
        }
        self.state = next;
    }

    fn fail(&mut self, err: FlowError) -> FlowError {
        tracing::error!(error = %err, error.type = err.error_type(), "Request flow step failed");
        match err.step() {
            Some(step) => self.transition(FlowState::Failed(step)),
            None if self.state.is_busy() => self.transition(FlowState::ModulesLoaded),
            None => {}
        }
        self.presenter.show_error(&err);
        err
    }

    fn reject(&mut self, action: &'static str) -> FlowError {
        let err = FlowError::InvalidState {
            action,
            state: self.state,
        };
        tracing::warn!(error = %err, "Rejected flow action");
        self.presenter.show_error(&err);
        err
    }
}

impl<H, P> RequestSubmissionFlow<H, P> {
    pub fn into_parts(self) -> (ApiClient<H>, P) {
        (self.api, self.presenter)
    }
}
