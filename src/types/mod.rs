// src/types/mod.rs
//! Domain records and the wire types shared by the server and its clients

pub mod company;
pub mod lenient;
pub mod profile;
pub mod response;
pub mod scoring;

pub use company::{AffiliatedCompany, Company, CompanyLocation, FundingInfo};
pub use profile::{Education, EnrichmentStatus, Experience, Profile};
pub use response::{
    EnrichmentCallback, HealthResponse, JobCreatedResponse, JobStatusResponse, WorkflowRun,
    WorkflowRunEnvelope, WorkflowState,
};
pub use scoring::{JobStatus, NewTemplate, PromptSelection, PromptTemplate, ScoreRequest, ScoringJob};
