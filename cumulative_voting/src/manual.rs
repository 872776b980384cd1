/*!

This is the long-form manual for `cumulative_voting` and `pbtab`.

## The voting scheme

Cumulative Support Transfer Voting (CSTV) is a budgeting scheme for groups in
which every donor receives the same personal budget and distributes it freely
over the candidate projects. The scheme funds projects one at a time:

1. A project is fundable when it meets the *eligibility* bar (its donations
   cover its cost).
2. Among the fundable projects, a *selection* rule picks the one to fund.
3. The donations that exceed the funded project's cost are not lost: they flow
   back to each donor's other projects, in proportion to how the donor already
   split their budget.
4. When nothing is fundable, a *rescue* procedure either moves support around
   to make a project fundable or eliminates a hopeless project and releases
   its donations.
5. When no more projects can be funded, a *cleanup* procedure may still spend
   the leftover budget on previously eliminated projects.

The four published combinations of these procedures are available as presets:

| preset | eligibility | selection | rescue | cleanup |
|--------|-------------|-----------|--------|---------|
| `ewt`  | excess support >= 0 | max excess | elimination with transfers | reverse eliminations |
| `ewtc` | support/cost >= 1 | max support-to-cost ratio | elimination with transfers | reverse eliminations |
| `mt`   | excess support >= 0 | max excess | minimal transfer | accept undersupported |
| `mtc`  | support/cost >= 1 | max support-to-cost ratio | minimal transfer | accept undersupported |

Preset names are matched case-insensitively. The `*c` variants weigh support
relative to cost, which tends to favor cheaper projects; the `mt*` variants
try to rescue a nearly-funded project by pulling in the minimal amount of
support instead of eliminating anything.

All ballots must sum to the same amount. This is a structural assumption of
the scheme (every donor carries the same weight) and the program rejects the
input otherwise.

## Input formats

### `json`

A single JSON object with the projects and the ballots:

```json
{
  "projects": [
    { "name": "Mural", "cost": 35.0 },
    { "name": "Bike shed", "cost": 30.0 },
    { "name": "Garden", "cost": 20.0 }
  ],
  "ballots": [
    { "donations": { "Mural": 5.0, "Bike shed": 10.0, "Garden": 5.0 } },
    { "donations": { "Bike shed": 15.0, "Garden": 5.0 } }
  ]
}
```

Projects missing from a ballot count as a zero donation. Donations must be
non-negative and finite.

### `excel`

An Excel (.xlsx) spreadsheet with the projects as columns:

|         | Mural | Bike shed | Garden |
|---------|-------|-----------|--------|
| costs   | 35    | 30        | 20     |
| donor 1 | 5     | 10        | 5      |
| donor 2 | 0     | 15        | 5      |

The first row carries the project names, the second row the costs, and each
following row is one donor ballot. Empty cells count as zero. The label in
the first column is ignored. The first worksheet of the workbook is read.

## Output

The outcome is printed as human-readable log lines (set `-v` for the per-pass
details) and, with `--out`, written as a JSON summary:

```json
{
  "selected": ["Bike shed", "Garden"],
  "totalSpent": 50.0,
  "budgetLeft": 10.0,
  "passes": [ ... ]
}
```

Each entry of `passes` records the support tally at the start of the pass,
the project funded in that pass (with its cost and excess support), and the
projects eliminated while rescuing the pass. A trailing entry records what
the cleanup procedure accepted from the eliminated projects.

The `--reference` flag compares the generated summary against a previously
saved one and prints a diff, which is convenient for regression-testing a
recorded budgeting round.

## Determinism

Runs are fully deterministic. Ties between projects with an equal score are
broken lexicographically by project name (the library also offers breaking
ties by input order). Internally all arithmetic is exact rational arithmetic,
so results do not depend on the order in which transfers are applied.

*/
