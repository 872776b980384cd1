/*!

# Quick start

This example walks through a small participatory budgeting round from a
spreadsheet to a funded project list.

Suppose a neighborhood gives each of its five members a personal budget of 20
to split freely between three proposed projects: a mural (cost 35), a bike
shed (cost 30) and a community garden (cost 20). Collect the donations in a
spreadsheet, one column per project and one row per donor:

| | Mural | Bike shed | Garden |
|---|---|---|---|
| costs | 35 | 30 | 20 |
| donor 1 | 5 | 10 | 5 |
| donor 2 | 10 | 10 | 0 |
| donor 3 | 0 | 15 | 5 |
| donor 4 | 0 | 0 | 20 |
| donor 5 | 15 | 5 | 0 |

The first row carries the project names, the second row the costs, and every
following row is one donor ballot. Export it in the Excel format (xlsx) and
run:

```bash
pbtab -i budget_round.xlsx --input-type excel --preset ewt
```

The program logs each pass and prints the outcome:

```text
[INFO  cumulative_voting] run_allocation: processing 5 ballots over 3 projects
[INFO  cumulative_voting] run_allocation: selected projects: ["Bike shed", "Garden", "Mural"], spent 85
```

The bike shed gathers the most support above its cost, so it is funded first;
the surplus donations flow back to the donors' other projects, which lets the
garden and then the mural reach their own costs. With these ballots all three
projects end up funded and 15 of the collective budget of 100 is left over.

**Choosing a rule.** The `--preset` flag selects one of four published rule
combinations: `ewt`, `ewtc`, `mt` and `mtc`. See the [manual](../manual/index.html)
for what they mean. When in doubt, `ewt` is a reasonable default.

**Machine-readable output.** Pass `--out summary.json` to also write a JSON
summary with the selection, the amounts spent, and per-pass statistics. This
file is stable across runs and suitable for archiving or diffing:

```bash
pbtab -i budget_round.xlsx --input-type excel --preset ewt --out summary.json
```

If your input is already in JSON, see the input section of the manual.

*/
