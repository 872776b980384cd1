use log::{debug, info, warn};

use cumulative_voting::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use calamine::{open_workbook, Reader, Xlsx};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

#[derive(Debug, Snafu)]
pub enum PbError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Missing worksheet or row in {path}"))]
    EmptyExcel { path: String },
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display(""))]
    WritingSummary { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type PbResult<T> = Result<T, PbError>;

pub mod instance_reader {
    use crate::pb::*;
    use std::collections::BTreeMap;

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct JsonProject {
        pub name: String,
        pub cost: f64,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct JsonBallot {
        pub donations: BTreeMap<String, f64>,
    }

    #[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct JsonInstance {
        pub projects: Vec<JsonProject>,
        pub ballots: Vec<JsonBallot>,
    }

    pub fn read_json_instance(path: String) -> PbResult<(Vec<Project>, Vec<CumulativeBallot>)> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        let inst: JsonInstance =
            serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        let projects: Vec<Project> = inst
            .projects
            .iter()
            .map(|p| Project {
                name: p.name.clone(),
                cost: p.cost,
            })
            .collect();
        let ballots: Vec<CumulativeBallot> = inst
            .ballots
            .iter()
            .map(|b| CumulativeBallot {
                donations: b.donations.iter().map(|(n, a)| (n.clone(), *a)).collect(),
            })
            .collect();
        Ok((projects, ballots))
    }

    pub fn read_summary(path: String) -> PbResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        debug!("read content: {:?}", contents);
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }
}

pub mod excel_reader {
    use crate::pb::*;

    fn cell_amount(cell: &calamine::DataType) -> PbResult<Option<f64>> {
        match cell {
            calamine::DataType::Float(f) => Ok(Some(*f)),
            calamine::DataType::Int(i) => Ok(Some(*i as f64)),
            calamine::DataType::Empty => Ok(None),
            x => whatever!("Unexpected cell content: {:?}", x),
        }
    }

    /// Expected layout: first row is the project names, second row the costs,
    /// every further row is one donor ballot. The first column carries row
    /// labels and is skipped. The first worksheet of the workbook is read.
    pub fn read_excel_instance(path: String) -> PbResult<(Vec<Project>, Vec<CumulativeBallot>)> {
        let mut workbook: Xlsx<_> = open_workbook(path.clone()).context(OpeningExcelSnafu {
            path: path.clone(),
        })?;
        let wrange = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| PbError::EmptyExcel { path: path.clone() })?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        let mut rows = wrange.rows();
        let header = rows
            .next()
            .ok_or_else(|| PbError::EmptyExcel { path: path.clone() })?;
        debug!("header: {:?}", header);
        if header.len() < 2 {
            whatever!("No project columns found in {:?}", path);
        }
        let mut names: Vec<String> = Vec::new();
        for cell in header[1..].iter() {
            match cell {
                calamine::DataType::String(s) => names.push(s.clone()),
                x => whatever!("Expected a project name, got: {:?}", x),
            }
        }
        let cost_row = rows
            .next()
            .ok_or_else(|| PbError::EmptyExcel { path: path.clone() })?;
        let mut projects: Vec<Project> = Vec::new();
        for (name, cell) in names.iter().zip(cost_row[1..].iter()) {
            match cell_amount(cell)? {
                Some(cost) => projects.push(Project {
                    name: name.clone(),
                    cost,
                }),
                None => whatever!("Missing cost for project {:?}", name),
            }
        }
        let mut ballots: Vec<CumulativeBallot> = Vec::new();
        for row in rows {
            debug!("workbook row: {:?}", row);
            let mut donations: Vec<(String, f64)> = Vec::new();
            for (name, cell) in names.iter().zip(row[1..].iter()) {
                // An empty cell is a zero donation.
                if let Some(amount) = cell_amount(cell)? {
                    donations.push((name.clone(), amount));
                }
            }
            ballots.push(CumulativeBallot { donations });
        }
        Ok((projects, ballots))
    }
}

fn pass_stats_to_json(result: &AllocationResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for pass_stat in result.pass_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, amount) in pass_stat.tally.iter() {
            tally.insert(name.clone(), json!(*amount));
        }
        let funded: Vec<JSValue> = pass_stat
            .tally_funded
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "cost": f.cost,
                    "excess": f.excess
                })
            })
            .collect();
        let js = json!({
            "pass": pass_stat.pass,
            "tally": tally,
            "funded": funded,
            "eliminated": pass_stat.tally_eliminated
        });
        l.push(js);
    }
    l
}

fn build_summary_js(result: &AllocationResult) -> JSValue {
    json!({
        "selected": result.selected,
        "totalSpent": result.total_spent,
        "budgetLeft": result.budget_left,
        "passes": pass_stats_to_json(result)
    })
}

pub fn run_budgeting(args: &Args) -> PbResult<()> {
    let input_type = args
        .input_type
        .clone()
        .unwrap_or_else(|| "json".to_string());
    let (projects, ballots) = match input_type.as_str() {
        "json" => instance_reader::read_json_instance(args.input.clone())?,
        "excel" => excel_reader::read_excel_instance(args.input.clone())?,
        x => whatever!("Input type not implemented {:?}", x),
    };
    info!(
        "Read {} projects and {} ballots from {}",
        projects.len(),
        ballots.len(),
        args.input
    );

    let preset = args.preset.clone().unwrap_or_else(|| "ewt".to_string());
    let res = run_allocation_preset(&projects, &ballots, preset.as_str());
    debug!("res {:?}", res);
    let result = match res {
        Result::Ok(x) => x,
        Result::Err(x) => {
            whatever!("Allocation error: {}", x)
        }
    };

    // Assemble the final json
    let result_js = build_summary_js(&result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;
    println!("summary:{}", pretty_js_stats);

    if let Some(out_p) = args.out.clone() {
        fs::write(out_p, pretty_js_stats.as_str()).context(WritingSummarySnafu {})?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = args.reference.clone() {
        let summary_ref = instance_reader::read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Args;

    const INSTANCE: &str = r#"{
      "projects": [
        {"name": "A", "cost": 35.0},
        {"name": "B", "cost": 30.0},
        {"name": "C", "cost": 20.0}
      ],
      "ballots": [
        {"donations": {"A": 5.0, "B": 10.0, "C": 5.0}},
        {"donations": {"A": 10.0, "B": 10.0}},
        {"donations": {"B": 15.0, "C": 5.0}},
        {"donations": {"C": 20.0}},
        {"donations": {"A": 15.0, "B": 5.0}}
      ]
    }"#;

    fn temp_path(name: &str) -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("pbtab_test_{}_{}", std::process::id(), name));
        p.as_os_str().to_str().unwrap().to_string()
    }

    fn args(input: &str) -> Args {
        Args {
            input: input.to_string(),
            input_type: None,
            preset: None,
            out: None,
            reference: None,
            verbose: false,
        }
    }

    #[test]
    fn json_instance_end_to_end() {
        let input = temp_path("e2e_instance.json");
        std::fs::write(&input, INSTANCE).unwrap();
        let out = temp_path("e2e_summary.json");
        let mut a = args(&input);
        a.out = Some(out.clone());
        run_budgeting(&a).unwrap();
        let summary: JSValue =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        let selected: Vec<String> = summary["selected"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(selected, vec!["B", "C", "A"]);
        assert_eq!(summary["totalSpent"].as_f64().unwrap(), 85.0);
        assert_eq!(summary["budgetLeft"].as_f64().unwrap(), 0.0);
    }

    #[test]
    fn summary_matches_reference() {
        let input = temp_path("ref_instance.json");
        std::fs::write(&input, INSTANCE).unwrap();
        let out = temp_path("ref_summary.json");
        let mut a = args(&input);
        a.out = Some(out.clone());
        run_budgeting(&a).unwrap();
        // A second run against the recorded summary passes the check.
        let mut a2 = args(&input);
        a2.reference = Some(out);
        run_budgeting(&a2).unwrap();
    }

    #[test]
    fn summary_mismatch_is_an_error() {
        let input = temp_path("mismatch_instance.json");
        std::fs::write(&input, INSTANCE).unwrap();
        let reference = temp_path("mismatch_reference.json");
        std::fs::write(&reference, r#"{"selected": ["A"]}"#).unwrap();
        let mut a = args(&input);
        a.reference = Some(reference);
        assert!(run_budgeting(&a).is_err());
    }

    #[test]
    fn unknown_input_type_is_an_error() {
        let input = temp_path("badtype_instance.json");
        std::fs::write(&input, INSTANCE).unwrap();
        let mut a = args(&input);
        a.input_type = Some("csv".to_string());
        assert!(run_budgeting(&a).is_err());
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let input = temp_path("badpreset_instance.json");
        std::fs::write(&input, INSTANCE).unwrap();
        let mut a = args(&input);
        a.preset = Some("xyz".to_string());
        assert!(run_budgeting(&a).is_err());
    }
}
