pub use crate::config::*;

/// A builder for assembling an allocation instance incrementally.
///
/// Useful when projects and ballots come from a stream rather than from a
/// complete file.
///
/// ```
/// pub use cumulative_voting::builder::Builder;
/// pub use cumulative_voting::AllocationRules;
/// # use cumulative_voting::AllocationErrors;
///
/// let mut builder = Builder::new(&AllocationRules::EWT)?
///     .project("Garden", 45.0)?
///     .project("Kiosk", 30.0)?;
///
/// builder.add_ballot(&[("Garden".to_string(), 20.0), ("Kiosk".to_string(), 10.0)])?;
/// builder.add_ballot(&[("Kiosk".to_string(), 30.0)])?;
///
/// let result = builder.run()?;
/// assert_eq!(result.selected, vec!["Kiosk".to_string()]);
///
/// # Ok::<(), AllocationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _rules: AllocationRules,
    pub(crate) _projects: Vec<Project>,
    pub(crate) _ballots: Vec<CumulativeBallot>,
}

impl Builder {
    pub fn new(rules: &AllocationRules) -> Result<Builder, AllocationErrors> {
        Ok(Builder {
            _rules: rules.clone(),
            _projects: Vec::new(),
            _ballots: Vec::new(),
        })
    }

    /// Declares one candidate project. Duplicate names are only detected when
    /// the allocation runs.
    pub fn project(mut self, name: &str, cost: f64) -> Result<Builder, AllocationErrors> {
        self._projects.push(Project {
            name: name.to_string(),
            cost,
        });
        Ok(self)
    }

    /// Adds one donor ballot as (project name, donated amount) pairs.
    ///
    /// Missing projects count as a zero donation and repeated names are
    /// summed. Validation against the declared projects happens at run time.
    pub fn add_ballot(&mut self, donations: &[(String, f64)]) -> Result<(), AllocationErrors> {
        self.add_ballot_2(&CumulativeBallot {
            donations: donations.to_vec(),
        })
    }

    pub fn add_ballot_2(&mut self, ballot: &CumulativeBallot) -> Result<(), AllocationErrors> {
        self._ballots.push(ballot.clone());
        Ok(())
    }

    /// Runs the allocation over everything added so far.
    pub fn run(&self) -> Result<AllocationResult, AllocationErrors> {
        crate::run_allocation(&self._projects, &self._ballots, &self._rules)
    }
}
