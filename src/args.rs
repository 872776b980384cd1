use clap::Parser;

/// This is a participatory budgeting tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the budgeting instance: the candidate projects and the
    /// donor ballots. For more information about the file formats, read the documentation.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (default json) The type of the input: 'json' or 'excel'. See documentation for the
    /// expected layout of each format.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default ewt) The rule combination to run: one of 'ewt', 'ewtc', 'mt' or 'mtc',
    /// case-insensitive.
    #[clap(short, long, value_parser)]
    pub preset: Option<String>,

    /// (file path or empty) If specified, the summary of the allocation will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the summary of an allocation in JSON format. If
    /// provided, pbtab will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
