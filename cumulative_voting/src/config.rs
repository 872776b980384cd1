// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// A candidate project: a unique name and a (non-negative) cost.
///
/// Projects are immutable once defined. The cost is expressed in the same
/// unit as the donations on the ballots.
#[derive(PartialEq, Debug, Clone)]
pub struct Project {
    pub name: String,
    pub cost: f64,
}

/// A cumulative ballot: one donor distributing a personal budget over
/// projects, by name.
///
/// Entries may be missing (treated as a zero donation) and the same name may
/// appear several times (the amounts are summed). All ballots of an instance
/// must sum to the same total, otherwise the run is rejected before any work
/// starts.
#[derive(PartialEq, Debug, Clone)]
pub struct CumulativeBallot {
    pub donations: Vec<(String, f64)>,
}

// ******** Output data structures *********

/// A project funded during a pass, with the excess support it had at the
/// moment it was accepted.
#[derive(PartialEq, Debug, Clone)]
pub struct FundedStats {
    pub name: String,
    pub cost: f64,
    pub excess: f64,
}

/// Statistics for one pass of the main loop (plus one trailing entry for the
/// cleanup phase).
#[derive(PartialEq, Debug, Clone)]
pub struct PassStats {
    pub pass: u32,
    /// Current support for every project still in the pool, in input order.
    pub tally: Vec<(String, f64)>,
    pub tally_funded: Vec<FundedStats>,
    pub tally_eliminated: Vec<String>,
}

/// The outcome of a run: the budget allocation plus per-pass statistics.
#[derive(PartialEq, Debug, Clone)]
pub struct AllocationResult {
    /// Accepted projects, in acceptance order. Feasible by construction:
    /// the costs sum to at most the initial total donor budget.
    pub selected: Vec<String>,
    /// The sum of the accepted projects' costs.
    pub total_spent: f64,
    /// What the donors still held when the run ended. Remainders forfeited by
    /// donors who were all-in on a funded project are counted in neither
    /// `total_spent` nor here.
    pub budget_left: f64,
    pub pass_stats: Vec<PassStats>,
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AllocationErrors {
    /// The donor ballots do not all sum to the same amount.
    UnequalDonorBudgets,
    /// The preset string is not one of the known combinations.
    UnknownPreset(String),
    /// A ballot donates to a project that is not part of the instance.
    UnknownProject(String),
    /// Two projects carry the same name.
    DuplicateProject(String),
    /// A cost or donation is NaN or infinite.
    NonFiniteAmount(String),
    /// A ballot carries a negative donation.
    NegativeDonation(String),
    /// A project has a negative cost.
    NegativeCost(String),
}

impl Error for AllocationErrors {}

impl Display for AllocationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationErrors::UnequalDonorBudgets => {
                write!(f, "not all donor ballots sum to the same amount")
            }
            AllocationErrors::UnknownPreset(s) => write!(f, "unknown preset: {}", s),
            AllocationErrors::UnknownProject(s) => write!(f, "unknown project on ballot: {}", s),
            AllocationErrors::DuplicateProject(s) => write!(f, "duplicate project name: {}", s),
            AllocationErrors::NonFiniteAmount(s) => write!(f, "non-finite amount for {}", s),
            AllocationErrors::NegativeDonation(s) => write!(f, "negative donation for {}", s),
            AllocationErrors::NegativeCost(s) => write!(f, "negative cost for project {}", s),
        }
    }
}

// ********* Configuration **********

// The policy knobs mirror the four interchangeable procedures of the CSTV
// paper (Skowron, Slinko, Szufa, Talmon 2020): eligibility bar, selection
// rule, rescue procedure and cleanup procedure.

/// The funding bar a project has to meet to be fundable right now.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EligibilityRule {
    /// GE: excess support >= 0.
    GeneralElection,
    /// GSC: support-to-cost ratio >= 1. Zero-cost projects count as eligible.
    GreatestSupportToCost,
}

/// How to pick one project out of a non-empty candidate set.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum SelectionRule {
    /// Maximize support minus cost.
    MaxExcess,
    /// Maximize support divided by cost.
    MaxSupportCostRatio,
}

/// What to do when no project currently meets the funding bar.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum RescueProcedure {
    /// Eliminate the most under-funded project and transfer all of its
    /// support to the donors' other projects.
    EliminationWithTransfers,
    /// Pull the minimal amount of support from the donors' other projects
    /// onto a chosen project until it meets its cost.
    MinimalTransfer,
}

/// The final pass over eliminated projects once the pool is empty.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CleanupProcedure {
    /// Walk the eliminated projects most-recently-eliminated first and accept
    /// greedily whatever still fits the remaining budget.
    ReverseEliminations,
    /// Re-rank the eliminated projects with the selection rule; accept the
    /// top one if it fits, discard it otherwise, until none remain.
    AcceptUndersupported,
}

/// Tie-breaking between projects with an equal score. Must be deterministic
/// so that runs stay reproducible.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Prefer the lexicographically smallest project name.
    LexicographicByName,
    /// Prefer the project that appears first in the input order.
    UseProjectOrder,
}

/// A full policy combination for one run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AllocationRules {
    pub eligibility: EligibilityRule,
    pub selection: SelectionRule,
    pub rescue: RescueProcedure,
    pub cleanup: CleanupProcedure,
    pub tie_break_mode: TieBreakMode,
}

impl AllocationRules {
    /// GE + max excess + elimination-with-transfers + reverse-eliminations.
    pub const EWT: AllocationRules = AllocationRules {
        eligibility: EligibilityRule::GeneralElection,
        selection: SelectionRule::MaxExcess,
        rescue: RescueProcedure::EliminationWithTransfers,
        cleanup: CleanupProcedure::ReverseEliminations,
        tie_break_mode: TieBreakMode::LexicographicByName,
    };

    /// GSC + max ratio + elimination-with-transfers + reverse-eliminations.
    pub const EWTC: AllocationRules = AllocationRules {
        eligibility: EligibilityRule::GreatestSupportToCost,
        selection: SelectionRule::MaxSupportCostRatio,
        rescue: RescueProcedure::EliminationWithTransfers,
        cleanup: CleanupProcedure::ReverseEliminations,
        tie_break_mode: TieBreakMode::LexicographicByName,
    };

    /// GE + max excess + minimal-transfer + accept-undersupported.
    pub const MT: AllocationRules = AllocationRules {
        eligibility: EligibilityRule::GeneralElection,
        selection: SelectionRule::MaxExcess,
        rescue: RescueProcedure::MinimalTransfer,
        cleanup: CleanupProcedure::AcceptUndersupported,
        tie_break_mode: TieBreakMode::LexicographicByName,
    };

    /// GSC + max ratio + minimal-transfer + accept-undersupported.
    pub const MTC: AllocationRules = AllocationRules {
        eligibility: EligibilityRule::GreatestSupportToCost,
        selection: SelectionRule::MaxSupportCostRatio,
        rescue: RescueProcedure::MinimalTransfer,
        cleanup: CleanupProcedure::AcceptUndersupported,
        tie_break_mode: TieBreakMode::LexicographicByName,
    };

    /// Resolves a preset name (case-insensitive) to a policy combination.
    ///
    /// The known presets are `"ewt"`, `"ewtc"`, `"mt"` and `"mtc"`.
    pub fn from_preset(name: &str) -> Result<AllocationRules, AllocationErrors> {
        match name.to_lowercase().as_str() {
            "ewt" => Ok(AllocationRules::EWT),
            "ewtc" => Ok(AllocationRules::EWTC),
            "mt" => Ok(AllocationRules::MT),
            "mtc" => Ok(AllocationRules::MTC),
            _ => Err(AllocationErrors::UnknownPreset(name.to_string())),
        }
    }
}
