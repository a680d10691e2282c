//! Lead intake workflow.
//!
//! One submission runs through a fixed sequence of steps; the first failing
//! step ends the submission and becomes the response:
//!
//! 1. Parse body (400 on failure).
//! 2. Validate and normalize the phone (400 with every field error).
//! 3. Find the sales agent by CRECI (404 when absent).
//! 4. Find the customer by phone, creating it when absent.
//! 5. Look for an existing sales card for the customer (409 when present).
//! 6. Create the sales card (202).
//!
//! Pipefy errors abort at whichever step they occur (500). Nothing is retried
//! and nothing is rolled back: a customer created in step 4 stays in place if
//! step 6 fails. Two concurrent submissions for the same customer can both pass
//! step 5 and create two cards.
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::config::PipefyConfig;
use crate::errors::{AppError, ResultExt};
use crate::models::{
    fields, Card, FieldAttribute, FieldSearch, IntakeResponseBody, LeadResponse, RecordRef,
    Submission,
};
use crate::pipefy_client::{PipefyApi, PipefyClient};
use crate::validation::{format_phone_number, validate_submission};

pub const MALFORMED_BODY_MESSAGE: &str = "Failed to parse request body";
pub const ALREADY_REGISTERED_MESSAGE: &str =
    "A solicitação já foi registrada. Por favor, aguarde nosso contato";

/// Workflow states, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeStep {
    ParseBody,
    Validate,
    FindSalesAgent,
    FindCustomer,
    CreateCustomer,
    FindCard,
    CreateSalesCard,
}

impl IntakeStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntakeStep::ParseBody => "parse_body",
            IntakeStep::Validate => "validate",
            IntakeStep::FindSalesAgent => "find_sales_agent",
            IntakeStep::FindCustomer => "find_customer",
            IntakeStep::CreateCustomer => "create_customer",
            IntakeStep::FindCard => "find_card",
            IntakeStep::CreateSalesCard => "create_sales_card",
        }
    }
}

impl fmt::Display for IntakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a successful submission resolved or created.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    pub submission: Submission,
    pub sales_agent: RecordRef,
    pub customer: RecordRef,
    pub customer_created: bool,
    pub card: RecordRef,
}

impl IntakeOutcome {
    /// The sales agent is always echoed, the customer only when it was created
    /// by this submission, the card always (it is always new).
    pub fn response_body(&self) -> IntakeResponseBody {
        IntakeResponseBody {
            sales_agent: Some(self.sales_agent.clone()),
            customer: self.customer_created.then(|| self.customer.clone()),
            card: Some(self.card.clone()),
        }
    }
}

/// Orchestrates one lead submission against Pipefy.
#[derive(Clone)]
pub struct LeadIntake {
    api: Arc<dyn PipefyApi>,
    config: PipefyConfig,
}

impl LeadIntake {
    pub fn new(api: Arc<dyn PipefyApi>, config: PipefyConfig) -> Self {
        Self { api, config }
    }

    /// Builds the intake on top of the real Pipefy client.
    pub fn from_config(config: &PipefyConfig) -> Result<Self, AppError> {
        let client = PipefyClient::new(config)?;
        Ok(Self::new(Arc::new(client), config.clone()))
    }

    /// Runs the workflow and turns the result into a response. Never fails.
    pub async fn submit_lead(&self, raw_body: &[u8]) -> LeadResponse {
        match self.process(raw_body).await {
            Ok(outcome) => {
                tracing::info!(
                    "✅ Lead registered: card={}, customer={} (created: {}), sales_agent={}",
                    outcome.card.id,
                    outcome.customer.id,
                    outcome.customer_created,
                    outcome.sales_agent.id
                );
                LeadResponse::new(StatusCode::ACCEPTED, json!(outcome.response_body()))
            }
            Err(e) => LeadResponse::from(e),
        }
    }

    /// Runs the workflow, returning the typed outcome.
    pub async fn process(&self, raw_body: &[u8]) -> Result<IntakeOutcome, AppError> {
        step(IntakeStep::ParseBody);
        let body: Value = serde_json::from_slice(raw_body).map_err(|e| {
            tracing::error!("Failed to parse request body: {}", e);
            AppError::MalformedInput(MALFORMED_BODY_MESSAGE.to_string())
        })?;

        step(IntakeStep::Validate);
        let mut submission = validate_submission(&body)?;
        submission.phone = format_phone_number(&submission.phone);
        tracing::debug!("Normalized phone: {}", submission.phone);

        let sales_agent = self.find_sales_agent(&submission.creci).await?;

        let (customer, customer_created) = match self.find_customer(&submission.phone).await? {
            Some(customer) => {
                tracing::info!("Customer already exists: {}", customer.id);
                (customer, false)
            }
            None => {
                let customer = self.create_customer(&submission, &sales_agent).await?;
                (customer, true)
            }
        };

        if let Some(card) = self.find_sales_card(&customer).await? {
            tracing::warn!(
                "⚠️  Sales card already exists for customer {}({}): {}",
                submission.phone,
                customer.id,
                card.id
            );
            return Err(AppError::Conflict(ALREADY_REGISTERED_MESSAGE.to_string()));
        }

        let card = self.create_sales_card(&customer, &sales_agent).await?;

        Ok(IntakeOutcome {
            submission,
            sales_agent,
            customer,
            customer_created,
            card,
        })
    }

    async fn find_sales_agent(&self, creci: &str) -> Result<RecordRef, AppError> {
        step(IntakeStep::FindSalesAgent);
        let search = FieldSearch::new(fields::sales_agent::CRECI, creci);

        self.api
            .find_record(&self.config.sales_agents_table_id, &search)
            .await
            .with_context(|| format!("Failed to find sales agent with creci {}", creci))?
            .filter(|agent| !agent.id.is_empty())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Não foi possível localizar um corretor cadastrado com o CRECI {}",
                    creci
                ))
            })
    }

    async fn find_customer(&self, phone: &str) -> Result<Option<RecordRef>, AppError> {
        step(IntakeStep::FindCustomer);
        let search = FieldSearch::new(fields::customer::PHONE, phone);

        let customer = self
            .api
            .find_record(&self.config.customers_table_id, &search)
            .await
            .with_context(|| format!("Failed to find customer with phone {}", phone))?;

        Ok(customer.filter(|customer| !customer.id.is_empty()))
    }

    async fn create_customer(
        &self,
        submission: &Submission,
        sales_agent: &RecordRef,
    ) -> Result<RecordRef, AppError> {
        step(IntakeStep::CreateCustomer);
        let attributes = [
            FieldAttribute::new(fields::customer::EMAIL, submission.email.as_str()),
            FieldAttribute::new(fields::customer::PHONE, submission.phone.as_str()),
            FieldAttribute::new(fields::customer::FULL_NAME, submission.full_name.as_str()),
            FieldAttribute::new(fields::customer::ZIP, submission.zip.as_str()),
            FieldAttribute::new(
                fields::customer::ENERGY_CONSUMPTION,
                submission.energy_consumption.to_string(),
            ),
            FieldAttribute::new(fields::customer::SALES_AGENT, sales_agent.id.as_str()),
        ];

        self.api
            .create_record(&self.config.customers_table_id, &attributes)
            .await
            .context("Failed to create customer record")
    }

    async fn find_sales_card(&self, customer: &RecordRef) -> Result<Option<Card>, AppError> {
        step(IntakeStep::FindCard);
        let search = FieldSearch::new(fields::sales_card::CUSTOMER, customer.id.as_str());

        let card = self
            .api
            .find_card(&self.config.sales_pipe_id, &search)
            .await
            .context("Failed to find card")?;

        Ok(card.filter(|card| !card.id.is_empty()))
    }

    async fn create_sales_card(
        &self,
        customer: &RecordRef,
        sales_agent: &RecordRef,
    ) -> Result<RecordRef, AppError> {
        step(IntakeStep::CreateSalesCard);
        let attributes = [
            FieldAttribute::new(fields::sales_card::CUSTOMER, customer.id.as_str()),
            FieldAttribute::new(fields::sales_card::SALES_AGENT, sales_agent.id.as_str()),
        ];

        self.api
            .create_card(&self.config.sales_pipe_id, &attributes)
            .await
            .context("Failed to create sales card")
    }
}

fn step(current: IntakeStep) {
    tracing::debug!("➡️  {}", current);
}
