use amp_abund::lib_amp_abund;
use amp_mltree::lib_amp_mltree;
use amp_umap::lib_amp_umap;

const KEYS: [&str; 4] = ["--samples", "--rank", "--target", "--target-rank"];

/// run the integrated pipeline for one target: abundance -> umap -> mltree
pub fn lib(mut args: Vec<String>) {
    __check_args(&args);

    // WARN: will expect to always have outdir as last argument
    let outdir = args.pop().unwrap_or_else(|| {
        panic!(
            "ERROR: Missing output directory argument, you had: {:?}",
            args
        )
    });

    let samples = value_of(&args, "--samples");
    let rank = value_of(&args, "--rank");
    let target = value_of(&args, "--target");
    let target_rank = value_of(&args, "--target-rank");

    lib_amp_abund(vec![
        "--samples".to_string(),
        samples.clone(),
        "--rank".to_string(),
        rank,
        "--outdir".to_string(),
        format!("{}/abund", outdir),
    ])
    .expect("ERROR: Failed to plot relative abundances");

    lib_amp_umap(vec![
        "target".to_string(),
        "--samples".to_string(),
        samples.clone(),
        "--target".to_string(),
        target.clone(),
        "--target-rank".to_string(),
        target_rank.clone(),
        "--save-dir".to_string(),
        format!("{}/umap", outdir),
    ])
    .expect("ERROR: Failed to build UMAP embedding");

    lib_amp_mltree(vec![
        "--samples".to_string(),
        samples,
        "--target".to_string(),
        target,
        "--target-rank".to_string(),
        target_rank,
        "--save-dir".to_string(),
        format!("{}/mltree", outdir),
    ])
    .expect("ERROR: Failed to build MLTree");
}

/// value following a `--key` argument
fn value_of(args: &[String], key: &str) -> String {
    args.iter()
        .position(|arg| arg == key)
        .and_then(|pos| args.get(pos + 1))
        .unwrap_or_else(|| panic!("ERROR: Missing value for {}", key))
        .clone()
}

/// check if all required arguments are present
fn __check_args(args: &Vec<String>) {
    for key in KEYS.iter() {
        if !args.contains(&key.to_string()) {
            log::error!("Missing required argument: {}", key);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_of_returns_following_token() {
        let args = vec![
            "--samples".to_string(),
            "data".to_string(),
            "--rank".to_string(),
            "family".to_string(),
        ];

        assert_eq!(value_of(&args, "--samples"), "data");
        assert_eq!(value_of(&args, "--rank"), "family");
    }

    #[test]
    #[should_panic]
    fn test_value_of_panics_on_missing_key() {
        let args = vec!["--samples".to_string()];
        value_of(&args, "--rank");
    }
}
