use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // `--dataVolume [opts]s3://bucket/...:/mount`; jfs and cache volumes are left alone.
    static ref MOUNT_RE: Regex =
        Regex::new(r"(--dataVolume)\s+(\[(?:[^\]]*)\]s3://[^:\s]+:[^\s']+)")
            .expect("valid mount pattern");
}

/// Object-storage mount directives declared in a config override, verbatim
/// and in order of appearance.
pub fn extract_mount_paths(input: &str) -> Vec<String> {
    MOUNT_RE
        .find_iter(input)
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

/// Submission arguments for the directives: flag and value as separate words.
pub fn mount_args(input: &str) -> Vec<String> {
    extract_mount_paths(input)
        .iter()
        .filter_map(|directive| directive.split_once(char::is_whitespace))
        .flat_map(|(flag, value)| [flag.to_string(), value.trim_start().to_string()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"process {
				executor = 'float'
				errorStrategy = 'retry'
				extra = '--dataVolume [opts=" --cache-dir /mnt/jfs_cache "]jfs://${jfs_private_ip}:6868/1:/mnt/jfs --dataVolume [size=120]:/mnt/jfs_cache --vmPolicy [retryLimit=10,retryInterval=300s] --migratePolicy [disable=true] --dumpMode incremental --snapLocation [mode=rw]s3://cfdx-juicefs-snapshots --dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=rw]s3://bucket-experiments/:/bucket-experiments --dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-research/:/bucket-research --dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-data/:/bucket-data --dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-entry/:/bucket-entry'
			}"#;

    #[test]
    fn full_override() {
        assert_eq!(
            extract_mount_paths(FULL),
            vec![
                "--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=rw]s3://bucket-experiments/:/bucket-experiments",
                "--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-research/:/bucket-research",
                "--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-data/:/bucket-data",
                "--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://bucket-entry/:/bucket-entry",
            ]
        );
    }

    #[test]
    fn empty_input() {
        assert!(extract_mount_paths("").is_empty());
    }

    #[test]
    fn no_data_volume() {
        assert!(extract_mount_paths("process { executor = 'float' errorStrategy = 'retry' }").is_empty());
    }

    #[test]
    fn single_s3_volume() {
        let input = "--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=rw]s3://bucket-experiments/:/bucket-experiments";
        assert_eq!(extract_mount_paths(input), vec![input]);
    }

    #[test]
    fn mixed_volumes_keep_only_s3() {
        let input = "--dataVolume jfs://example.com:/path --dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://cfdx-data/:/cfdx-data";
        assert_eq!(
            extract_mount_paths(input),
            vec!["--dataVolume [endpoint=s3.us-east-1.amazonaws.com,mode=r]s3://cfdx-data/:/cfdx-data"]
        );
    }

    #[test]
    fn args_split_flag_and_value() {
        let input = "a --dataVolume [mode=r]s3://one/:/one b --dataVolume [mode=rw]s3://two/:/two";
        assert_eq!(
            mount_args(input),
            vec![
                "--dataVolume",
                "[mode=r]s3://one/:/one",
                "--dataVolume",
                "[mode=rw]s3://two/:/two",
            ]
        );
    }
}
