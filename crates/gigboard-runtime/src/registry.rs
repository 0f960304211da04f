#![forbid(unsafe_code)]

//! Per-role view registration.
//!
//! Each role carries a fixed set of dashboard views; their predicates close
//! over the session identity and their specs are fixed for the session's
//! lifetime. Filters and orderings mirror the dashboards: a client watches
//! their own postings, a freelancer watches the open marketplace
//! (best-funded first) and their active contracts, an arbiter watches the
//! dispute queue.

use std::num::NonZeroUsize;

use gigboard_core::record::{AccountId, JobStatus, Role};
use gigboard_core::view::{DEFAULT_PAGE_SIZE, ViewName, ViewSpec};

/// Builds the view set for one session.
#[derive(Debug, Clone)]
pub struct ViewRegistry {
    identity: AccountId,
    role: Role,
    category: Option<String>,
    page_size: NonZeroUsize,
}

impl ViewRegistry {
    /// Registry for a session identity and role, with the default page size
    /// and no marketplace category filter.
    #[must_use]
    pub fn new(identity: AccountId, role: Role) -> Self {
        Self {
            identity,
            role,
            category: None,
            page_size: NonZeroUsize::new(DEFAULT_PAGE_SIZE).unwrap(),
        }
    }

    /// Restrict the marketplace view to one category.
    ///
    /// Specs are fixed per session, so changing the filter means ending the
    /// session and starting a new one — same as switching accounts.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Page size for every view this registry builds.
    #[must_use]
    pub fn page_size(mut self, page_size: NonZeroUsize) -> Self {
        self.page_size = page_size;
        self
    }

    /// The session identity the view predicates close over.
    #[must_use]
    pub fn identity(&self) -> &AccountId {
        &self.identity
    }

    /// The session role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Build the named view specs for this session.
    #[must_use]
    pub fn build(&self) -> Vec<(ViewName, ViewSpec)> {
        match self.role {
            Role::Client => {
                let me = self.identity.clone();
                vec![(
                    ViewName::ClientJobs,
                    ViewSpec::new(self.page_size).filter(move |job| job.client == me),
                )]
            }
            Role::Freelancer => {
                let category = self.category.clone();
                let marketplace = ViewSpec::new(self.page_size)
                    .filter(move |job| {
                        job.status == JobStatus::Open
                            && category.as_ref().is_none_or(|c| &job.category == c)
                    })
                    .order_by(|a, b| b.max_budget.cmp(&a.max_budget));

                let me = self.identity.clone();
                let contracts =
                    ViewSpec::new(self.page_size).filter(move |job| job.freelancer == me);

                vec![
                    (ViewName::Marketplace, marketplace),
                    (ViewName::MyContracts, contracts),
                ]
            }
            Role::Arbiter => vec![(
                ViewName::DisputedJobs,
                ViewSpec::new(self.page_size).filter(|job| job.status == JobStatus::Disputed),
            )],
        }
    }
}
