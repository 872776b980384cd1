pub mod builder;
mod config;
pub mod manual;
pub mod quick_start;

use log::{debug, info};

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use std::collections::HashMap;

pub use crate::config::*;

// **** Private structures ****

/// All internal arithmetic is exact. Donations enter as `f64` (every finite
/// float is a rational) and are only converted back for display purposes.
type Amount = BigRational;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct ProjectId(u32);

fn pidx(p: ProjectId) -> usize {
    p.0 as usize
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct ProjectInternal {
    name: String,
    cost: Amount,
}

/// Excesses within this distance of zero count as an exact match: the support
/// is taken entirely as payment and nothing is redistributed.
fn excess_tolerance() -> Amount {
    Amount::new(BigInt::from(1), BigInt::from(100))
}

fn to_display(a: &Amount) -> f64 {
    a.to_f64().unwrap_or(f64::NAN)
}

/// The donor-by-project support table. One row per donor, one column per
/// project of the instance; columns are kept for the whole run, including for
/// projects that have left the pool.
///
/// This is the only mutable state of the algorithm. Every transfer below is
/// applied in full before anything else reads the table again.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Ledger {
    rows: Vec<Vec<Amount>>,
}

impl Ledger {
    fn support(&self, p: ProjectId) -> Amount {
        self.rows
            .iter()
            .fold(Amount::zero(), |acc, row| acc + &row[pidx(p)])
    }

    fn donor_total(&self, donor: usize) -> Amount {
        self.rows[donor]
            .iter()
            .fold(Amount::zero(), |acc, c| acc + c)
    }

    fn total_support(&self) -> Amount {
        (0..self.rows.len()).fold(Amount::zero(), |acc, i| acc + self.donor_total(i))
    }

    fn zero_column(&mut self, p: ProjectId) {
        for row in self.rows.iter_mut() {
            row[pidx(p)] = Amount::zero();
        }
    }

    /// Payment-and-redistribution for a freshly funded project. For every
    /// donor, the `gamma` fraction of the donation to `p` is retained as
    /// payment and the remainder is spread over the donor's other nonzero
    /// entries in proportion to their current share. The column of `p` ends
    /// up zero in every row; a donor with nothing left outside `p` simply has
    /// the entry zeroed.
    fn redistribute_funded(&mut self, p: ProjectId, gamma: &Amount) {
        for row in self.rows.iter_mut() {
            let donation = std::mem::replace(&mut row[pidx(p)], Amount::zero());
            if donation.is_zero() {
                continue;
            }
            let freed = &donation * &(Amount::one() - gamma);
            let others = row.iter().fold(Amount::zero(), |acc, c| acc + c);
            if others.is_zero() {
                continue;
            }
            let factor = (&others + &freed) / &others;
            for cell in row.iter_mut() {
                if !cell.is_zero() {
                    *cell *= &factor;
                }
            }
        }
    }

    /// Full transfer away from an eliminated project (the gamma = 0 case).
    /// A donor whose entire remaining budget sits on the eliminated project
    /// keeps the entry in place: there is nothing to transfer it to.
    fn redistribute_eliminated(&mut self, p: ProjectId) {
        for row in self.rows.iter_mut() {
            if row[pidx(p)].is_zero() {
                continue;
            }
            let others = row
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != pidx(p))
                .fold(Amount::zero(), |acc, (_, c)| acc + c);
            if others.is_zero() {
                continue;
            }
            let donation = std::mem::replace(&mut row[pidx(p)], Amount::zero());
            let factor = (&others + &donation) / &others;
            for cell in row.iter_mut() {
                if !cell.is_zero() {
                    *cell *= &factor;
                }
            }
        }
    }
}

fn excess(ledger: &Ledger, projects: &[ProjectInternal], p: ProjectId) -> Amount {
    ledger.support(p) - &projects[pidx(p)].cost
}

// **** Eligibility ****

/// The subset of the pool that currently meets the funding bar. Pure over
/// (pool, ledger); may be empty.
fn eligible_projects(
    pool: &[ProjectId],
    ledger: &Ledger,
    projects: &[ProjectInternal],
    rule: EligibilityRule,
) -> Vec<ProjectId> {
    pool.iter()
        .filter(|&&p| {
            let cost = &projects[pidx(p)].cost;
            match rule {
                EligibilityRule::GeneralElection => !excess(ledger, projects, p).is_negative(),
                // A zero-cost project has an unbounded ratio: always eligible.
                EligibilityRule::GreatestSupportToCost if cost.is_zero() => true,
                EligibilityRule::GreatestSupportToCost => {
                    &ledger.support(p) / cost >= Amount::one()
                }
            }
        })
        .copied()
        .collect()
}

// **** Selection ****

/// Picks exactly one project from a non-empty candidate set: the one with
/// the maximal score under the selection rule, ties resolved by the
/// deterministic tie-break mode.
///
/// Ratios are compared by cross-multiplication so that zero-cost projects
/// never divide by zero.
fn select_project(
    candidates: &[ProjectId],
    ledger: &Ledger,
    projects: &[ProjectInternal],
    selection: SelectionRule,
    tie_break: TieBreakMode,
) -> ProjectId {
    assert!(!candidates.is_empty(), "no candidate to select from");
    let supports: Vec<(ProjectId, Amount)> = candidates
        .iter()
        .map(|&p| (p, ledger.support(p)))
        .collect();
    let mut best = &supports[0];
    for cand in supports[1..].iter() {
        let cand_cost = &projects[pidx(cand.0)].cost;
        let best_cost = &projects[pidx(best.0)].cost;
        let ord = match selection {
            SelectionRule::MaxExcess => (&cand.1 - cand_cost).cmp(&(&best.1 - best_cost)),
            SelectionRule::MaxSupportCostRatio => {
                (&cand.1 * best_cost).cmp(&(&best.1 * cand_cost))
            }
        };
        let wins = match ord {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => match tie_break {
                TieBreakMode::LexicographicByName => {
                    projects[pidx(cand.0)].name < projects[pidx(best.0)].name
                }
                TieBreakMode::UseProjectOrder => cand.0 < best.0,
            },
        };
        if wins {
            best = cand;
        }
    }
    best.0
}

// **** Rescue procedures ****

/// Eliminates the pool project with the least excess support and transfers
/// all of its support to the donors' other projects. Returns false when the
/// pool is too small to eliminate from (the last project, if any, is moved to
/// the eliminated list).
fn elimination_with_transfers(
    pool: &mut Vec<ProjectId>,
    ledger: &mut Ledger,
    projects: &[ProjectInternal],
    eliminated: &mut Vec<ProjectId>,
) -> bool {
    if pool.len() < 2 {
        debug!("elimination_with_transfers: not enough projects to eliminate");
        if let Some(last) = pool.pop() {
            eliminated.push(last);
        }
        return false;
    }
    let mut min_p = pool[0];
    let mut min_excess = excess(ledger, projects, min_p);
    for &p in pool[1..].iter() {
        let e = excess(ledger, projects, p);
        if e < min_excess {
            min_p = p;
            min_excess = e;
        }
    }
    debug!(
        "elimination_with_transfers: eliminating {} (excess {})",
        projects[pidx(min_p)].name,
        min_excess
    );
    ledger.redistribute_eliminated(min_p);
    pool.retain(|&p| p != min_p);
    eliminated.push(min_p);
    true
}

/// Pulls the minimal amount of support from the donors' other projects onto a
/// chosen target until it meets its cost.
///
/// Only projects whose supporters' combined remaining budgets could cover the
/// cost are considered as targets; the selection rule picks among them. If no
/// project stands a chance, the rescue fails without touching anything. If
/// the inner loop ever finds every supporter with their whole budget already
/// on the target, the rescue gives up and conservatively moves the whole pool
/// to the eliminated list.
fn minimal_transfer(
    pool: &mut Vec<ProjectId>,
    ledger: &mut Ledger,
    projects: &[ProjectInternal],
    eliminated: &mut Vec<ProjectId>,
    selection: SelectionRule,
    tie_break: TieBreakMode,
) -> bool {
    let mut candidates: Vec<ProjectId> = Vec::new();
    for &p in pool.iter() {
        let reachable = ledger
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row[pidx(p)].is_positive())
            .fold(Amount::zero(), |acc, (i, _)| acc + ledger.donor_total(i));
        if reachable >= projects[pidx(p)].cost {
            candidates.push(p);
        }
    }
    if candidates.is_empty() {
        debug!("minimal_transfer: no project can be rescued");
        return false;
    }
    let chosen = select_project(&candidates, ledger, projects, selection, tie_break);
    let ci = pidx(chosen);
    let cost = projects[ci].cost.clone();
    debug!("minimal_transfer: pulling support towards {}", projects[ci].name);

    let supporters: Vec<usize> = (0..ledger.rows.len())
        .filter(|&i| ledger.rows[i][ci].is_positive())
        .collect();

    loop {
        let support = ledger.support(chosen);
        if support >= cost {
            return true;
        }
        // Supporters that still hold support outside the target.
        let active: Vec<usize> = supporters
            .iter()
            .filter(|&&i| ledger.donor_total(i) != ledger.rows[i][ci])
            .copied()
            .collect();
        if active.is_empty() {
            // Every supporter is all-in and the target still falls short.
            debug!("minimal_transfer: stuck, no supporter has spare capacity");
            eliminated.append(pool);
            return false;
        }
        // The donations of all-in supporters are fixed; the active ones have
        // to bring the rest. Scale their donations uniformly towards the
        // shortfall, clamped at each donor's full budget. Either nobody gets
        // clamped and the target is met exactly, or at least one donor goes
        // all-in and the next round handles the remainder.
        let fixed = supporters
            .iter()
            .filter(|&&i| !active.contains(&i))
            .fold(Amount::zero(), |acc, &i| acc + &ledger.rows[i][ci]);
        let active_support = active
            .iter()
            .fold(Amount::zero(), |acc, &i| acc + &ledger.rows[i][ci]);
        let scale = (&cost - &fixed) / &active_support;
        for &i in active.iter() {
            let donation = ledger.rows[i][ci].clone();
            let total = ledger.donor_total(i);
            let capacity = &total - &donation;
            let needed = &donation * &scale - &donation;
            let to_move = if capacity < needed { capacity.clone() } else { needed };
            let factor = (&capacity - &to_move) / &capacity;
            let row = &mut ledger.rows[i];
            for (j, cell) in row.iter_mut().enumerate() {
                if j != ci && !cell.is_zero() {
                    *cell *= &factor;
                }
            }
            row[ci] += to_move;
        }
    }
}

// **** Cleanup procedures ****

/// Walks the eliminated projects most-recently-eliminated first and greedily
/// accepts whatever still fits the remaining budget. Returns the accepted
/// projects in acceptance order.
fn reverse_eliminations(
    eliminated: &[ProjectId],
    projects: &[ProjectInternal],
    budget: &mut Amount,
) -> Vec<ProjectId> {
    let mut accepted = Vec::new();
    for &p in eliminated.iter().rev() {
        let cost = &projects[pidx(p)].cost;
        if *cost <= *budget {
            accepted.push(p);
            *budget -= cost;
        }
    }
    accepted
}

/// Repeatedly re-ranks the eliminated projects with the selection rule and
/// accepts the top one if its cost fits the remaining budget, discarding it
/// for good otherwise. Returns (accepted, discarded).
fn accept_undersupported(
    eliminated: &[ProjectId],
    ledger: &Ledger,
    projects: &[ProjectInternal],
    budget: &mut Amount,
    selection: SelectionRule,
    tie_break: TieBreakMode,
) -> (Vec<ProjectId>, Vec<ProjectId>) {
    let mut remaining: Vec<ProjectId> = eliminated.to_vec();
    let mut accepted = Vec::new();
    let mut discarded = Vec::new();
    while !remaining.is_empty() {
        let top = select_project(&remaining, ledger, projects, selection, tie_break);
        remaining.retain(|&p| p != top);
        let cost = &projects[pidx(top)].cost;
        if *cost <= *budget {
            accepted.push(top);
            *budget -= cost;
        } else {
            discarded.push(top);
        }
    }
    (accepted, discarded)
}

// **** Input validation ****

struct CheckResult {
    projects: Vec<ProjectInternal>,
    ledger: Ledger,
}

/// Validates the instance and builds the initial ledger. The ballots are
/// checked against the declared projects and the equal-cumulative-budget
/// invariant before anything else runs.
fn checks(
    projects: &[Project],
    ballots: &[CumulativeBallot],
) -> Result<CheckResult, AllocationErrors> {
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut internal: Vec<ProjectInternal> = Vec::new();
    for (idx, p) in projects.iter().enumerate() {
        let cost = BigRational::from_float(p.cost)
            .ok_or_else(|| AllocationErrors::NonFiniteAmount(p.name.clone()))?;
        if cost.is_negative() {
            return Err(AllocationErrors::NegativeCost(p.name.clone()));
        }
        if by_name.insert(p.name.clone(), idx).is_some() {
            return Err(AllocationErrors::DuplicateProject(p.name.clone()));
        }
        internal.push(ProjectInternal {
            name: p.name.clone(),
            cost,
        });
    }

    let mut rows: Vec<Vec<Amount>> = Vec::with_capacity(ballots.len());
    for ballot in ballots.iter() {
        let mut row = vec![Amount::zero(); internal.len()];
        for (name, amount) in ballot.donations.iter() {
            let idx = *by_name
                .get(name)
                .ok_or_else(|| AllocationErrors::UnknownProject(name.clone()))?;
            let v = BigRational::from_float(*amount)
                .ok_or_else(|| AllocationErrors::NonFiniteAmount(name.clone()))?;
            if v.is_negative() {
                return Err(AllocationErrors::NegativeDonation(name.clone()));
            }
            row[idx] += v;
        }
        rows.push(row);
    }
    let ledger = Ledger { rows };

    let mut totals = (0..ledger.rows.len()).map(|i| ledger.donor_total(i));
    if let Some(first) = totals.next() {
        if totals.any(|t| t != first) {
            return Err(AllocationErrors::UnequalDonorBudgets);
        }
    }
    Ok(CheckResult {
        projects: internal,
        ledger,
    })
}

// **** Driver ****

/// Runs the CSTV budgeting algorithm over the given instance.
///
/// The driver repeatedly funds one eligible project per pass, redistributing
/// the excess support through the ledger. When no project is eligible, the
/// configured rescue procedure either makes one eligible or eliminates
/// projects; once the pool is empty (or rescue is exhausted), the configured
/// cleanup procedure fills the remaining budget from the eliminated projects.
///
/// Arguments:
/// * `projects` the candidate projects, in input order
/// * `ballots` one cumulative ballot per donor; all ballots must sum to the
///   same amount
/// * `rules` the policy combination that governs this run
pub fn run_allocation(
    projects: &[Project],
    ballots: &[CumulativeBallot],
    rules: &AllocationRules,
) -> Result<AllocationResult, AllocationErrors> {
    info!(
        "run_allocation: processing {:?} ballots over {:?} projects, rules: {:?}",
        ballots.len(),
        projects.len(),
        rules
    );
    let cr = checks(projects, ballots)?;
    let internal = cr.projects;
    let mut ledger = cr.ledger;

    let total_budget = ledger.total_support();
    debug!("run_allocation: total budget {}", total_budget);
    let mut spent = Amount::zero();

    let mut pool: Vec<ProjectId> = (0..internal.len() as u32).map(ProjectId).collect();
    let mut selected: Vec<ProjectId> = Vec::new();
    let mut eliminated: Vec<ProjectId> = Vec::new();
    let mut pass_stats: Vec<PassStats> = Vec::new();
    let mut rescue_exhausted = false;

    // Each pass removes exactly one project from the pool (accepted here, or
    // eliminated through rescue), so this loop runs at most once per project.
    while !pool.is_empty() && !rescue_exhausted {
        let pass = pass_stats.len() as u32 + 1;
        let tally: Vec<(String, f64)> = pool
            .iter()
            .map(|&p| {
                (
                    internal[pidx(p)].name.clone(),
                    to_display(&ledger.support(p)),
                )
            })
            .collect();
        let eliminated_before = eliminated.len();
        let mut tally_funded: Vec<FundedStats> = Vec::new();

        let mut eligible = eligible_projects(&pool, &ledger, &internal, rules.eligibility);
        while eligible.is_empty() {
            let rescued = match rules.rescue {
                RescueProcedure::EliminationWithTransfers => {
                    elimination_with_transfers(&mut pool, &mut ledger, &internal, &mut eliminated)
                }
                RescueProcedure::MinimalTransfer => minimal_transfer(
                    &mut pool,
                    &mut ledger,
                    &internal,
                    &mut eliminated,
                    rules.selection,
                    rules.tie_break_mode,
                ),
            };
            if !rescued {
                rescue_exhausted = true;
                break;
            }
            eligible = eligible_projects(&pool, &ledger, &internal, rules.eligibility);
        }

        if !rescue_exhausted {
            let p = select_project(
                &eligible,
                &ledger,
                &internal,
                rules.selection,
                rules.tie_break_mode,
            );
            let support = ledger.support(p);
            let cost = internal[pidx(p)].cost.clone();
            let exc = &support - &cost;
            debug!(
                "run_allocation: funding {} with excess {}",
                internal[pidx(p)].name,
                exc
            );
            if exc > excess_tolerance() {
                // gamma = cost / (excess + cost); the rest of each donation
                // flows back to the donor's other projects.
                let gamma = &cost / &(&exc + &cost);
                ledger.redistribute_funded(p, &gamma);
            } else {
                // An exact match within tolerance: the whole support is
                // payment, nothing is worth redistributing.
                ledger.zero_column(p);
            }
            tally_funded.push(FundedStats {
                name: internal[pidx(p)].name.clone(),
                cost: to_display(&cost),
                excess: to_display(&exc),
            });
            selected.push(p);
            pool.retain(|&q| q != p);
            spent += &cost;
        }

        let tally_eliminated: Vec<String> = eliminated[eliminated_before..]
            .iter()
            .map(|&p| internal[pidx(p)].name.clone())
            .collect();
        pass_stats.push(PassStats {
            pass,
            tally,
            tally_funded,
            tally_eliminated,
        });
    }

    // The budget left for cleanup is what the donors still hold in the
    // ledger. A donor who was all-in on a funded project forfeited the freed
    // remainder, so this can be less than the initial budget minus the
    // spending.
    let mut budget = ledger.total_support();

    // Final pass over the eliminated projects with whatever budget is left.
    if !eliminated.is_empty() {
        let pass = pass_stats.len() as u32 + 1;
        let tally: Vec<(String, f64)> = eliminated
            .iter()
            .map(|&p| {
                (
                    internal[pidx(p)].name.clone(),
                    to_display(&ledger.support(p)),
                )
            })
            .collect();
        let (accepted, discarded) = match rules.cleanup {
            CleanupProcedure::ReverseEliminations => (
                reverse_eliminations(&eliminated, &internal, &mut budget),
                Vec::new(),
            ),
            CleanupProcedure::AcceptUndersupported => accept_undersupported(
                &eliminated,
                &ledger,
                &internal,
                &mut budget,
                rules.selection,
                rules.tie_break_mode,
            ),
        };
        let tally_funded: Vec<FundedStats> = accepted
            .iter()
            .map(|&p| FundedStats {
                name: internal[pidx(p)].name.clone(),
                cost: to_display(&projects_cost(&internal, p)),
                excess: to_display(&excess(&ledger, &internal, p)),
            })
            .collect();
        let tally_eliminated: Vec<String> = discarded
            .iter()
            .map(|&p| internal[pidx(p)].name.clone())
            .collect();
        if !accepted.is_empty() || !tally_eliminated.is_empty() {
            pass_stats.push(PassStats {
                pass,
                tally,
                tally_funded,
                tally_eliminated,
            });
        }
        for &p in accepted.iter() {
            spent += &internal[pidx(p)].cost;
        }
        selected.extend(accepted);
    }

    let selected_names: Vec<String> = selected
        .iter()
        .map(|&p| internal[pidx(p)].name.clone())
        .collect();
    info!(
        "run_allocation: selected projects: {:?}, spent {}",
        selected_names, spent
    );
    Ok(AllocationResult {
        selected: selected_names,
        total_spent: to_display(&spent),
        budget_left: to_display(&budget),
        pass_stats,
    })
}

fn projects_cost(projects: &[ProjectInternal], p: ProjectId) -> Amount {
    projects[pidx(p)].cost.clone()
}

/// Resolves a preset name and runs the corresponding policy combination.
/// Unknown names are a configuration error and nothing is computed.
pub fn run_allocation_preset(
    projects: &[Project],
    ballots: &[CumulativeBallot],
    preset: &str,
) -> Result<AllocationResult, AllocationErrors> {
    let rules = AllocationRules::from_preset(preset)?;
    run_allocation(projects, ballots, &rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, cost: f64) -> Project {
        Project {
            name: name.to_string(),
            cost,
        }
    }

    fn ballot(donations: &[(&str, f64)]) -> CumulativeBallot {
        CumulativeBallot {
            donations: donations
                .iter()
                .map(|(n, a)| (n.to_string(), *a))
                .collect(),
        }
    }

    /// The worked example from the CSTV paper: three projects, five donors
    /// with a personal budget of 20 each.
    fn paper_instance() -> (Vec<Project>, Vec<CumulativeBallot>) {
        let projects = vec![project("A", 35.0), project("B", 30.0), project("C", 20.0)];
        let ballots = vec![
            ballot(&[("A", 5.0), ("B", 10.0), ("C", 5.0)]),
            ballot(&[("A", 10.0), ("B", 10.0), ("C", 0.0)]),
            ballot(&[("A", 0.0), ("B", 15.0), ("C", 5.0)]),
            ballot(&[("A", 0.0), ("B", 0.0), ("C", 20.0)]),
            ballot(&[("A", 15.0), ("B", 5.0), ("C", 0.0)]),
        ];
        (projects, ballots)
    }

    fn rational(num: i64, den: i64) -> Amount {
        Amount::new(BigInt::from(num), BigInt::from(den))
    }

    fn ledger_from(rows: &[&[i64]]) -> Ledger {
        Ledger {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|&v| rational(v, 1)).collect())
                .collect(),
        }
    }

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() <= 0.01, "{} != {}", a, b);
    }

    #[test]
    fn ewt_paper_example_selects_all_three() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (projects, ballots) = paper_instance();
        let res = run_allocation_preset(&projects, &ballots, "ewt").unwrap();
        assert_eq!(res.selected.len(), 3);
        // B has the largest excess and is funded first.
        assert_eq!(res.selected[0], "B");
        approx(res.total_spent, 85.0);
        // Every donor ends up all-in on one of the funded projects, so the
        // forfeited remainders leave nothing behind.
        approx(res.budget_left, 0.0);
    }

    #[test]
    fn dropped_remainder_shrinks_cleanup_budget() {
        // Donor 1 is all-in on A: the 5 freed when A is funded is forfeited,
        // so only 5 is left at cleanup time and C (cost 9) does not fit.
        let projects = vec![project("A", 10.0), project("B", 10.0), project("C", 9.0)];
        let ballots = vec![
            ballot(&[("A", 15.0)]),
            ballot(&[("B", 10.0), ("C", 5.0)]),
        ];
        let res = run_allocation_preset(&projects, &ballots, "ewt").unwrap();
        assert_eq!(res.selected, vec!["A".to_string(), "B".to_string()]);
        approx(res.total_spent, 20.0);
        approx(res.budget_left, 5.0);
    }

    #[test]
    fn excess_redistribution_documented_example() {
        // gamma = 0.5 on project A: half of each donation to A is payment,
        // the other half flows back proportionally.
        let mut ledger = ledger_from(&[&[5, 10, 5], &[10, 0, 5]]);
        ledger.redistribute_funded(ProjectId(0), &rational(1, 2));
        approx(to_display(&ledger.rows[0][0]), 0.0);
        approx(to_display(&ledger.rows[0][1]), 11.67);
        approx(to_display(&ledger.rows[0][2]), 5.83);
        approx(to_display(&ledger.rows[1][0]), 0.0);
        approx(to_display(&ledger.rows[1][1]), 0.0);
        approx(to_display(&ledger.rows[1][2]), 10.0);
    }

    #[test]
    fn exact_match_redistribution_only_zeroes_the_target() {
        // gamma = 1: the whole donation is payment, the other columns do not
        // move at all.
        let mut ledger = ledger_from(&[&[5, 10, 5], &[10, 0, 5]]);
        let before = ledger.clone();
        ledger.redistribute_funded(ProjectId(1), &rational(1, 1));
        assert!(ledger.rows[0][1].is_zero());
        assert!(ledger.rows[1][1].is_zero());
        assert_eq!(ledger.rows[0][0], before.rows[0][0]);
        assert_eq!(ledger.rows[0][2], before.rows[0][2]);
        assert_eq!(ledger.rows[1][0], before.rows[1][0]);
        assert_eq!(ledger.rows[1][2], before.rows[1][2]);
    }

    #[test]
    fn eligibility_ge_example() {
        let projects = vec![
            ProjectInternal {
                name: "A".to_string(),
                cost: rational(35, 1),
            },
            ProjectInternal {
                name: "B".to_string(),
                cost: rational(30, 1),
            },
        ];
        let ledger = ledger_from(&[&[5, 30], &[10, 0]]);
        let pool = vec![ProjectId(0), ProjectId(1)];
        let eligible =
            eligible_projects(&pool, &ledger, &projects, EligibilityRule::GeneralElection);
        assert_eq!(eligible, vec![ProjectId(1)]);
    }

    #[test]
    fn unknown_preset_is_a_configuration_error() {
        let (projects, ballots) = paper_instance();
        let res = run_allocation_preset(&projects, &ballots, "xyz");
        assert_eq!(
            res,
            Err(AllocationErrors::UnknownPreset("xyz".to_string()))
        );
    }

    #[test]
    fn preset_lookup_is_case_insensitive() {
        assert_eq!(
            AllocationRules::from_preset("EwT").unwrap(),
            AllocationRules::EWT
        );
        assert_eq!(
            AllocationRules::from_preset("MTC").unwrap(),
            AllocationRules::MTC
        );
    }

    #[test]
    fn unequal_donor_budgets_are_rejected() {
        let projects = vec![project("A", 35.0), project("B", 30.0)];
        let ballots = vec![
            ballot(&[("A", 5.0), ("B", 10.0)]),
            ballot(&[("A", 10.0), ("B", 10.0)]),
        ];
        let res = run_allocation_preset(&projects, &ballots, "ewt");
        assert_eq!(res, Err(AllocationErrors::UnequalDonorBudgets));
    }

    #[test]
    fn negative_project_cost_is_rejected() {
        let projects = vec![project("A", -5.0), project("B", 10.0)];
        let ballots = vec![ballot(&[("B", 10.0)])];
        let res = run_allocation_preset(&projects, &ballots, "ewt");
        assert_eq!(res, Err(AllocationErrors::NegativeCost("A".to_string())));
    }

    #[test]
    fn unknown_project_on_ballot_is_rejected() {
        let projects = vec![project("A", 35.0)];
        let ballots = vec![ballot(&[("A", 5.0), ("D", 10.0)])];
        let res = run_allocation_preset(&projects, &ballots, "ewt");
        assert_eq!(res, Err(AllocationErrors::UnknownProject("D".to_string())));
    }

    #[test]
    fn elimination_transfer_conserves_support() {
        let projects = vec![
            ProjectInternal {
                name: "A".to_string(),
                cost: rational(30, 1),
            },
            ProjectInternal {
                name: "B".to_string(),
                cost: rational(30, 1),
            },
            ProjectInternal {
                name: "C".to_string(),
                cost: rational(20, 1),
            },
        ];
        let mut ledger = ledger_from(&[&[5, 10, 5], &[10, 0, 5]]);
        let total_before = ledger.total_support();
        let mut pool = vec![ProjectId(0), ProjectId(1), ProjectId(2)];
        let mut eliminated = Vec::new();
        let ok = elimination_with_transfers(&mut pool, &mut ledger, &projects, &mut eliminated);
        assert!(ok);
        // B is the most under-funded project (excess -20) and gets eliminated;
        // donor 1 doubles up on A and C, donor 2 had nothing on B.
        assert_eq!(eliminated, vec![ProjectId(1)]);
        approx(to_display(&ledger.rows[0][0]), 10.0);
        approx(to_display(&ledger.rows[0][1]), 0.0);
        approx(to_display(&ledger.rows[0][2]), 10.0);
        approx(to_display(&ledger.rows[1][0]), 10.0);
        approx(to_display(&ledger.rows[1][2]), 5.0);
        assert_eq!(ledger.total_support(), total_before);
    }

    #[test]
    fn minimal_transfer_pulls_just_enough() {
        let projects = vec![
            ProjectInternal {
                name: "A".to_string(),
                cost: rational(35, 1),
            },
            ProjectInternal {
                name: "B".to_string(),
                cost: rational(30, 1),
            },
        ];
        // B is reachable (its supporters control 30 in total), A is not.
        let mut ledger = ledger_from(&[&[5, 10], &[10, 5]]);
        let total_before = ledger.total_support();
        let mut pool = vec![ProjectId(0), ProjectId(1)];
        let mut eliminated = Vec::new();
        let ok = minimal_transfer(
            &mut pool,
            &mut ledger,
            &projects,
            &mut eliminated,
            SelectionRule::MaxExcess,
            TieBreakMode::LexicographicByName,
        );
        assert!(ok);
        assert!(eliminated.is_empty());
        assert_eq!(ledger.support(ProjectId(1)), rational(30, 1));
        // Transfers only moved support around.
        assert_eq!(ledger.total_support(), total_before);
    }

    #[test]
    fn minimal_transfer_without_reachable_project_fails_cleanly() {
        let projects = vec![ProjectInternal {
            name: "A".to_string(),
            cost: rational(50, 1),
        }];
        let mut ledger = ledger_from(&[&[10], &[10]]);
        let before = ledger.clone();
        let mut pool = vec![ProjectId(0)];
        let mut eliminated = Vec::new();
        let ok = minimal_transfer(
            &mut pool,
            &mut ledger,
            &projects,
            &mut eliminated,
            SelectionRule::MaxExcess,
            TieBreakMode::LexicographicByName,
        );
        assert!(!ok);
        assert!(eliminated.is_empty());
        assert_eq!(ledger, before);
    }

    #[test]
    fn mt_preset_funds_reachable_project_only() {
        let projects = vec![project("A", 35.0), project("B", 30.0)];
        let ballots = vec![
            ballot(&[("A", 5.0), ("B", 10.0)]),
            ballot(&[("A", 10.0), ("B", 5.0)]),
        ];
        let res = run_allocation_preset(&projects, &ballots, "mt").unwrap();
        assert_eq!(res.selected, vec!["B".to_string()]);
        approx(res.total_spent, 30.0);
        approx(res.budget_left, 0.0);
    }

    #[test]
    fn reverse_eliminations_prefers_recently_eliminated() {
        let projects = vec![
            ProjectInternal {
                name: "A".to_string(),
                cost: rational(30, 1),
            },
            ProjectInternal {
                name: "B".to_string(),
                cost: rational(30, 1),
            },
        ];
        // A was eliminated first, then B; only one fits the leftover budget.
        let eliminated = vec![ProjectId(0), ProjectId(1)];
        let mut budget = rational(30, 1);
        let accepted = reverse_eliminations(&eliminated, &projects, &mut budget);
        assert_eq!(accepted, vec![ProjectId(1)]);
        assert!(budget.is_zero());
    }

    #[test]
    fn accept_undersupported_takes_exact_fit() {
        let projects = vec![
            ProjectInternal {
                name: "A".to_string(),
                cost: rational(20, 1),
            },
            ProjectInternal {
                name: "B".to_string(),
                cost: rational(25, 1),
            },
        ];
        let ledger = ledger_from(&[&[10, 15]]);
        let eliminated = vec![ProjectId(0), ProjectId(1)];
        let mut budget = rational(20, 1);
        let (accepted, discarded) = accept_undersupported(
            &eliminated,
            &ledger,
            &projects,
            &mut budget,
            SelectionRule::MaxExcess,
            TieBreakMode::LexicographicByName,
        );
        // Both have excess -10, the name tie-break ranks A first, and A
        // costs exactly the remaining budget.
        assert_eq!(accepted, vec![ProjectId(0)]);
        assert_eq!(discarded, vec![ProjectId(1)]);
        assert!(budget.is_zero());
    }

    #[test]
    fn zero_budget_selects_nothing() {
        let projects = vec![project("A", 27.0), project("B", 30.0), project("C", 40.0)];
        let ballots = vec![
            ballot(&[("A", 0.0), ("B", 0.0), ("C", 0.0)]),
            ballot(&[("A", 0.0), ("B", 0.0), ("C", 0.0)]),
        ];
        for preset in ["ewt", "ewtc", "mt", "mtc"] {
            let res = run_allocation_preset(&projects, &ballots, preset).unwrap();
            assert!(res.selected.is_empty(), "preset {}", preset);
        }
    }

    #[test]
    fn budget_below_cheapest_cost_selects_nothing() {
        let projects = vec![project("A", 27.0), project("B", 30.0), project("C", 40.0)];
        let ballots: Vec<CumulativeBallot> = (0..5)
            .map(|_| ballot(&[("A", 1.0), ("B", 1.0), ("C", 1.0)]))
            .collect();
        for preset in ["ewt", "ewtc", "mt", "mtc"] {
            let res = run_allocation_preset(&projects, &ballots, preset).unwrap();
            assert!(res.selected.is_empty(), "preset {}", preset);
        }
    }

    #[test]
    fn all_presets_stay_feasible_and_terminate() {
        let projects = vec![
            project("Bridge", 120.0),
            project("Garden", 45.0),
            project("Kiosk", 30.0),
            project("Lights", 65.0),
            project("Mural", 15.0),
        ];
        let ballots = vec![
            ballot(&[("Bridge", 20.0), ("Garden", 10.0), ("Mural", 10.0)]),
            ballot(&[("Bridge", 15.0), ("Kiosk", 15.0), ("Lights", 10.0)]),
            ballot(&[("Garden", 20.0), ("Kiosk", 10.0), ("Mural", 10.0)]),
            ballot(&[("Lights", 30.0), ("Mural", 5.0), ("Garden", 5.0)]),
        ];
        let total_budget = 160.0;
        for preset in ["ewt", "ewtc", "mt", "mtc"] {
            let res = run_allocation_preset(&projects, &ballots, preset).unwrap();
            assert!(res.selected.len() <= projects.len());
            assert!(res.total_spent <= total_budget + 0.01, "preset {}", preset);
            // At most one funding pass per project plus the cleanup pass.
            assert!(res.pass_stats.len() <= projects.len() + 1);
        }
    }

    #[test]
    fn gsc_zero_cost_project_is_eligible() {
        let projects = vec![project("A", 0.0), project("B", 10.0)];
        let ballots = vec![ballot(&[("B", 10.0)])];
        let res = run_allocation_preset(&projects, &ballots, "ewtc").unwrap();
        assert_eq!(res.selected, vec!["A".to_string(), "B".to_string()]);
        approx(res.total_spent, 10.0);
    }

    #[test]
    fn exact_support_is_accepted_without_redistribution() {
        let projects = vec![project("A", 30.0), project("B", 10.0)];
        let ballots = vec![
            ballot(&[("A", 15.0), ("B", 5.0)]),
            ballot(&[("A", 15.0), ("B", 5.0)]),
        ];
        let res = run_allocation_preset(&projects, &ballots, "ewt").unwrap();
        // A matches its cost exactly, B matches its cost exactly.
        assert_eq!(res.selected.len(), 2);
        approx(res.total_spent, 40.0);
        approx(res.budget_left, 0.0);
    }

    #[test]
    fn empty_instance_returns_empty_allocation() {
        let res = run_allocation_preset(&[], &[], "ewt").unwrap();
        assert!(res.selected.is_empty());
        assert!(res.pass_stats.is_empty());
        approx(res.total_spent, 0.0);
    }
}
