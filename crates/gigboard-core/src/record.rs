#![forbid(unsafe_code)]

//! Ledger record types.
//!
//! Records are immutable-once-read snapshots of remote ledger entries. The
//! coordinator only interprets the key, the two party identities, and the
//! status; everything else is opaque sort/filter payload carried for the
//! presentation layer.

use std::fmt;

/// Key of a job record on the ledger.
///
/// Keys are strictly positive, allocated densely and monotonically by the
/// ledger, and never reused or deleted: `1..=count` is a complete enumeration
/// of all live keys at the instant `count` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobKey(u64);

impl JobKey {
    /// Create a key from a raw ledger index.
    ///
    /// Returns `None` for 0, which is never a valid key.
    #[must_use]
    pub const fn new(raw: u64) -> Option<Self> {
        if raw == 0 { None } else { Some(Self(raw)) }
    }

    /// Raw ledger index.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An account identity on the ledger.
///
/// The all-zero identity is reserved by the ledger as the absent sentinel:
/// an unassigned counterpart slot, or "no record here" when probing past the
/// end of a variable-length sub-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    /// The reserved zero identity.
    pub const ZERO_LITERAL: &'static str = "0x0000000000000000000000000000000000000000";

    /// Create an identity from its canonical string form.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The reserved zero identity.
    #[must_use]
    pub fn zero() -> Self {
        Self(Self::ZERO_LITERAL.to_string())
    }

    /// Whether this is the reserved zero identity.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Self::ZERO_LITERAL
    }

    /// Canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of a job on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Posted and accepting bids.
    Open,
    /// A freelancer is hired; funds are in escrow.
    InProgress,
    /// Work submitted, awaiting client approval.
    Completed,
    /// Approved and paid out.
    Closed,
    /// Under arbitration.
    Disputed,
    /// Arbitration finished.
    Resolved,
}

impl JobStatus {
    /// Human-readable status label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::Disputed => "disputed",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of the active viewer, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Resolves disputes.
    Arbiter,
    /// Posts jobs and hires.
    Client,
    /// Bids on and performs jobs.
    Freelancer,
}

impl Role {
    /// All roles, in ledger order.
    pub const ALL: [Role; 3] = [Role::Arbiter, Role::Client, Role::Freelancer];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Arbiter => "arbiter",
            Self::Client => "client",
            Self::Freelancer => "freelancer",
        })
    }
}

/// Snapshot of one job record.
///
/// `client` owns the job; `freelancer` is the zero identity until someone is
/// hired. Amounts are in the ledger's base unit; `deadline` is unix seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub key: JobKey,
    pub client: AccountId,
    pub freelancer: AccountId,
    pub status: JobStatus,
    pub title: String,
    pub category: String,
    pub max_budget: u128,
    pub agreed_amount: u128,
    pub deadline: u64,
}

impl Job {
    /// Create an open job with no freelancer and no agreed amount.
    #[must_use]
    pub fn open(key: JobKey, client: AccountId, title: impl Into<String>) -> Self {
        Self {
            key,
            client,
            freelancer: AccountId::zero(),
            status: JobStatus::Open,
            title: title.into(),
            category: String::new(),
            max_budget: 0,
            agreed_amount: 0,
            deadline: 0,
        }
    }

    /// Set the category.
    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the maximum budget.
    #[must_use]
    pub fn max_budget(mut self, amount: u128) -> Self {
        self.max_budget = amount;
        self
    }

    /// Set the deadline (unix seconds).
    #[must_use]
    pub fn deadline(mut self, deadline: u64) -> Self {
        self.deadline = deadline;
        self
    }
}

/// One entry in a job's variable-length bid list.
///
/// The ledger reports a bid with the zero freelancer identity for any slot
/// past the end of the list; that sentinel is how list termination is
/// discovered when probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub freelancer: AccountId,
    pub amount: u128,
    pub days_required: u64,
}

impl Bid {
    /// Create a bid.
    #[must_use]
    pub fn new(freelancer: AccountId, amount: u128, days_required: u64) -> Self {
        Self {
            freelancer,
            amount,
            days_required,
        }
    }

    /// The absent sentinel returned for slots past the end of a bid list.
    #[must_use]
    pub fn absent() -> Self {
        Self {
            freelancer: AccountId::zero(),
            amount: 0,
            days_required: 0,
        }
    }

    /// Whether this is the absent sentinel.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        self.freelancer.is_zero()
    }
}

/// Kind of change the ledger announces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    JobPosted,
    BidPlaced,
    FreelancerHired,
    WorkCompleted,
    WorkApproved,
    DisputeRaised,
    DisputeResolved,
}

impl NoticeKind {
    /// Every notice kind a session subscribes to.
    pub const ALL: [NoticeKind; 7] = [
        NoticeKind::JobPosted,
        NoticeKind::BidPlaced,
        NoticeKind::FreelancerHired,
        NoticeKind::WorkCompleted,
        NoticeKind::WorkApproved,
        NoticeKind::DisputeRaised,
        NoticeKind::DisputeResolved,
    ];

    /// Stable name for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JobPosted => "job-posted",
            Self::BidPlaced => "bid-placed",
            Self::FreelancerHired => "freelancer-hired",
            Self::WorkCompleted => "work-completed",
            Self::WorkApproved => "work-approved",
            Self::DisputeRaised => "dispute-raised",
            Self::DisputeResolved => "dispute-resolved",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A change notification delivered on a notice feed.
///
/// The payload is advisory: it names the kind and, when the ledger includes
/// it, the affected job. It is never complete enough to patch view state —
/// views are resynchronized by a full scan instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub kind: NoticeKind,
    pub job: Option<JobKey>,
}

impl ChangeNotice {
    /// Create a notice with no job payload.
    #[must_use]
    pub const fn new(kind: NoticeKind) -> Self {
        Self { kind, job: None }
    }

    /// Create a notice carrying the affected job key.
    #[must_use]
    pub const fn for_job(kind: NoticeKind, job: JobKey) -> Self {
        Self {
            kind,
            job: Some(job),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_rejects_zero() {
        assert!(JobKey::new(0).is_none());
        assert_eq!(JobKey::new(7).unwrap().get(), 7);
    }

    #[test]
    fn zero_identity_is_sentinel() {
        assert!(AccountId::zero().is_zero());
        assert!(!AccountId::new("0xabc").is_zero());
    }

    #[test]
    fn absent_bid_detected() {
        assert!(Bid::absent().is_absent());
        assert!(!Bid::new(AccountId::new("0xabc"), 10, 3).is_absent());
    }

    #[test]
    fn open_job_has_no_counterpart() {
        let job = Job::open(
            JobKey::new(1).unwrap(),
            AccountId::new("0xc1"),
            "site build",
        );
        assert!(job.freelancer.is_zero());
        assert_eq!(job.status, JobStatus::Open);
        assert_eq!(job.agreed_amount, 0);
    }

    #[test]
    fn notice_kind_names_are_unique() {
        let mut names: Vec<_> = NoticeKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), NoticeKind::ALL.len());
    }
}
