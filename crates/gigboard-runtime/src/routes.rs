#![forbid(unsafe_code)]

//! Static notification routing.
//!
//! Each change notice invalidates a fixed set of views, conditioned on the
//! active viewer's role. The table is data, not behavior: handlers stay
//! trivial forwarders and the complete routing surface is enumerable in one
//! place (and in one test).

use gigboard_core::record::{NoticeKind, Role};
use gigboard_core::view::ViewName;

/// The views a notice of this kind invalidates for a viewer of this role.
///
/// Combinations not listed refresh nothing.
#[must_use]
pub const fn invalidated_views(kind: NoticeKind, role: Role) -> &'static [ViewName] {
    use NoticeKind::*;
    use Role::*;
    use ViewName::*;

    match (kind, role) {
        (JobPosted, Client) => &[ClientJobs],
        (JobPosted, Freelancer) => &[Marketplace],

        (BidPlaced, Client) => &[ClientJobs],

        (FreelancerHired, Client) => &[ClientJobs],
        (FreelancerHired, Freelancer) => &[Marketplace, MyContracts],

        (WorkCompleted, Client) => &[ClientJobs],
        (WorkCompleted, Freelancer) => &[MyContracts],

        (WorkApproved, Client) => &[ClientJobs],
        (WorkApproved, Freelancer) => &[MyContracts],

        (DisputeRaised, Arbiter) => &[DisputedJobs],
        (DisputeRaised, Client) => &[ClientJobs],

        (DisputeResolved, Arbiter) => &[DisputedJobs],
        (DisputeResolved, Client) => &[ClientJobs],
        (DisputeResolved, Freelancer) => &[MyContracts],

        _ => &[],
    }
}
