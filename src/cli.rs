use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;

use crate::utils::errors::WeaverError;

pub fn build_cli() -> Command {
    Command::new("weaver")
        .about("Progressive multiple alignment of protein structures")
        .arg_required_else_help(true)
        .subcommand(msa_command())
        .subcommand(
            Command::new("shell-completion")
                .about("Generate a shell completion script")
                .arg(
                    Arg::new("output-file")
                        .short('o')
                        .long("output-file")
                        .required(true),
                )
                .arg(
                    Arg::new("shell")
                        .long("shell")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
}

fn msa_command() -> Command {
    Command::new("msa")
        .about("Compute a progressive multiple structure alignment")
        .arg(
            Arg::new("structure-db")
                .help("Structure database prefix")
                .required(true),
        )
        .arg(
            Arg::new("arg2")
                .help("Output prefix, or cluster database prefix with --precluster")
                .required(true),
        )
        .arg(Arg::new("arg3").help("Output prefix when --precluster is set"))
        .arg(
            Arg::new("precluster")
                .long("precluster")
                .help("Seed the guide tree with hits from an external clustering")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("guide-tree")
                .long("guide-tree")
                .help("Newick guide tree; skips the all-vs-all seeding pass"),
        )
        .arg(
            Arg::new("refine-iters")
                .long("refine-iters")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("match-ratio")
                .long("match-ratio")
                .value_parser(value_parser!(f32))
                .default_value("0.51"),
        )
        .arg(
            Arg::new("gap-open")
                .long("gap-open")
                .value_parser(value_parser!(i32))
                .default_value("10"),
        )
        .arg(
            Arg::new("gap-extend")
                .long("gap-extend")
                .value_parser(value_parser!(i32))
                .default_value("1"),
        )
        .arg(
            Arg::new("filter-msa")
                .long("filter-msa")
                .value_parser(value_parser!(u8))
                .default_value("1"),
        )
        .arg(
            Arg::new("filter-max-seq-id")
                .long("filter-max-seq-id")
                .value_parser(value_parser!(f32))
                .default_value("0.9"),
        )
        .arg(Arg::new("qid").long("qid").default_value("0.0"))
        .arg(
            Arg::new("qsc")
                .long("qsc")
                .value_parser(value_parser!(f32))
                .default_value("-20.0")
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("ndiff")
                .long("ndiff")
                .value_parser(value_parser!(usize))
                .default_value("1000"),
        )
        .arg(
            Arg::new("cov")
                .long("cov")
                .value_parser(value_parser!(f32))
                .default_value("0.0"),
        )
        .arg(
            Arg::new("filter-min-enable")
                .long("filter-min-enable")
                .value_parser(value_parser!(usize))
                .default_value("0"),
        )
        .arg(
            Arg::new("comp-bias-correction")
                .long("comp-bias-correction")
                .value_parser(value_parser!(u8))
                .default_value("1"),
        )
        .arg(
            Arg::new("comp-bias-correction-scale")
                .long("comp-bias-correction-scale")
                .value_parser(value_parser!(f32))
                .default_value("1.0"),
        )
        .arg(
            Arg::new("pair-threshold")
                .long("pair-threshold")
                .value_parser(value_parser!(f32))
                .default_value("0.0"),
        )
        .arg(
            Arg::new("max-seq-len")
                .long("max-seq-len")
                .value_parser(value_parser!(usize))
                .default_value("65535"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            Arg::new("verbosity")
                .short('v')
                .long("verbosity")
                .value_parser(value_parser!(usize))
                .default_value("2"),
        )
        .arg(
            Arg::new("wg")
                .long("wg")
                .value_parser(value_parser!(u8))
                .default_value("0"),
        )
        .arg(
            Arg::new("pca-aa")
                .long("pca-aa")
                .value_parser(value_parser!(f32))
                .default_value("1.1"),
        )
        .arg(
            Arg::new("pcb-aa")
                .long("pcb-aa")
                .value_parser(value_parser!(f32))
                .default_value("4.1"),
        )
        .arg(
            Arg::new("pca-3di")
                .long("pca-3di")
                .value_parser(value_parser!(f32))
                .default_value("1.4"),
        )
        .arg(
            Arg::new("pcb-3di")
                .long("pcb-3di")
                .value_parser(value_parser!(f32))
                .default_value("1.5"),
        )
        .arg(
            Arg::new("pcmode")
                .long("pcmode")
                .value_parser(value_parser!(i32))
                .default_value("1"),
        )
}

/// All knobs the engine consumes, resolved from the parsed matches.
#[derive(Debug, Clone)]
pub struct MsaParameters {
    pub structure_db: String,
    pub cluster_db: Option<String>,
    pub output: String,
    pub precluster: bool,
    pub guide_tree: Option<String>,
    pub refine_iters: usize,
    pub match_ratio: f32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub filter_msa: bool,
    pub filter_max_seq_id: f32,
    pub qid: String,
    pub qsc: f32,
    pub ndiff: usize,
    pub cov: f32,
    pub filter_min_enable: usize,
    pub comp_bias_correction: bool,
    pub comp_bias_correction_scale: f32,
    pub pair_threshold: f32,
    pub max_seq_len: usize,
    pub threads: usize,
    pub verbosity: usize,
    pub wg: bool,
    pub pca_aa: f32,
    pub pcb_aa: f32,
    pub pca_3di: f32,
    pub pcb_3di: f32,
    pub pc_mode: i32,
}

impl MsaParameters {
    pub fn from_matches(m: &ArgMatches) -> Result<Self, WeaverError> {
        let precluster = m.get_flag("precluster");
        let structure_db = m.get_one::<String>("structure-db").unwrap().clone();
        let arg2 = m.get_one::<String>("arg2").unwrap().clone();
        let arg3 = m.get_one::<String>("arg3").cloned();
        let (cluster_db, output) = if precluster {
            match arg3 {
                Some(output) => (Some(arg2), output),
                None => {
                    return Err(WeaverError::Io(
                        "--precluster requires a cluster database prefix and an output prefix"
                            .to_string(),
                    ))
                }
            }
        } else {
            (None, arg2)
        };
        Ok(MsaParameters {
            structure_db,
            cluster_db,
            output,
            precluster,
            guide_tree: m.get_one::<String>("guide-tree").cloned(),
            refine_iters: *m.get_one::<usize>("refine-iters").unwrap(),
            match_ratio: *m.get_one::<f32>("match-ratio").unwrap(),
            gap_open: *m.get_one::<i32>("gap-open").unwrap(),
            gap_extend: *m.get_one::<i32>("gap-extend").unwrap(),
            filter_msa: *m.get_one::<u8>("filter-msa").unwrap() != 0,
            filter_max_seq_id: *m.get_one::<f32>("filter-max-seq-id").unwrap(),
            qid: m.get_one::<String>("qid").unwrap().clone(),
            qsc: *m.get_one::<f32>("qsc").unwrap(),
            ndiff: *m.get_one::<usize>("ndiff").unwrap(),
            cov: *m.get_one::<f32>("cov").unwrap(),
            filter_min_enable: *m.get_one::<usize>("filter-min-enable").unwrap(),
            comp_bias_correction: *m.get_one::<u8>("comp-bias-correction").unwrap() != 0,
            comp_bias_correction_scale: *m.get_one::<f32>("comp-bias-correction-scale").unwrap(),
            pair_threshold: *m.get_one::<f32>("pair-threshold").unwrap(),
            max_seq_len: *m.get_one::<usize>("max-seq-len").unwrap(),
            threads: *m.get_one::<usize>("threads").unwrap(),
            verbosity: *m.get_one::<usize>("verbosity").unwrap(),
            wg: *m.get_one::<u8>("wg").unwrap() != 0,
            pca_aa: *m.get_one::<f32>("pca-aa").unwrap(),
            pcb_aa: *m.get_one::<f32>("pcb-aa").unwrap(),
            pca_3di: *m.get_one::<f32>("pca-3di").unwrap(),
            pcb_3di: *m.get_one::<f32>("pcb-3di").unwrap(),
            pc_mode: *m.get_one::<i32>("pcmode").unwrap(),
        })
    }
}

impl Default for MsaParameters {
    /// The command-line defaults, used directly by tests.
    fn default() -> Self {
        MsaParameters {
            structure_db: String::new(),
            cluster_db: None,
            output: String::new(),
            precluster: false,
            guide_tree: None,
            refine_iters: 0,
            match_ratio: 0.51,
            gap_open: 10,
            gap_extend: 1,
            filter_msa: true,
            filter_max_seq_id: 0.9,
            qid: "0.0".to_string(),
            qsc: -20.0,
            ndiff: 1000,
            cov: 0.0,
            filter_min_enable: 0,
            comp_bias_correction: true,
            comp_bias_correction_scale: 1.0,
            pair_threshold: 0.0,
            max_seq_len: 65535,
            threads: 1,
            verbosity: 2,
            wg: false,
            pca_aa: 1.1,
            pcb_aa: 4.1,
            pca_3di: 1.4,
            pcb_3di: 1.5,
            pc_mode: 1,
        }
    }
}
