/// Toggle the UCSC-style `chr` prefix of a chromosome name: strip it if
/// present, prepend it otherwise. Used to fall back gracefully when the VCF
/// and the reference or annotation disagree on naming.
pub(crate) fn toggle_chr_prefix(chrom: &str) -> String {
    match chrom.strip_prefix("chr") {
        Some(stripped) => stripped.to_owned(),
        None => format!("chr{}", chrom),
    }
}
