use std::fs;
use std::path::PathBuf;
use std::str;

use tempfile::TempDir;

use gsgp::spectrum::CATALOG;

/// Classes carrying nonzero weight in the synthetic signature library.
/// `DIRECT_CLASS` is hit by C>T at chr1:1000 (context A[C]G), `FLIPPED_CLASS`
/// by A>G at chr1:1250 (context T[A]C, strand flipped), `FILLER_CLASS` by any
/// A>C inside the plain poly-A background.
pub(crate) const DIRECT_CLASS: &str = "A[C>T]G";
pub(crate) const FLIPPED_CLASS: &str = "G[T>C]A";
pub(crate) const FILLER_CLASS: &str = "T[T>G]T";

const VCF_HEADER: &str = "##fileformat=VCFv4.2\n\
##contig=<ID=chr1,length=2000>\n\
##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n\
##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read depth\">\n\
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\ttumor\tnormal\n";

/// Input and output paths of one synthetic attribution run. The tempdir is
/// dropped together with the workspace.
pub(crate) struct Workspace {
    _dir: TempDir,
    pub(crate) reference: PathBuf,
    pub(crate) annotation: PathBuf,
    pub(crate) signatures: PathBuf,
    pub(crate) candidates: PathBuf,
    pub(crate) output: PathBuf,
    pub(crate) spectrum: PathBuf,
    pub(crate) summary: PathBuf,
}

/// Write reference, annotation, signature library and a VCF with the given
/// record lines into a tempdir.
pub(crate) fn workspace(vcf_records: &str) -> Workspace {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().unwrap();
    let reference = dir.path().join("reference.fa");
    let annotation = dir.path().join("genes.tsv");
    let signatures = dir.path().join("signatures.tsv");
    let candidates = dir.path().join("candidates.vcf");

    let mut fasta = String::from(">chr1\n");
    for chunk in reference_sequence().chunks(60) {
        fasta.push_str(str::from_utf8(chunk).unwrap());
        fasta.push('\n');
    }
    fs::write(&reference, fasta).unwrap();
    fs::write(dir.path().join("reference.fa.fai"), "chr1\t2000\t6\t60\t61\n").unwrap();

    fs::write(
        &annotation,
        "chromosome\tgene_id\tstart\tend\tstrand\n\
         chr1\tGENE1\t500\t1500\t+\n\
         chr1\tGENE2\t1200\t1300\t+\n",
    )
    .unwrap();

    fs::write(&signatures, signature_library()).unwrap();
    fs::write(&candidates, format!("{}{}", VCF_HEADER, vcf_records)).unwrap();

    Workspace {
        reference,
        annotation,
        signatures,
        candidates,
        output: dir.path().join("gsgp.tsv"),
        spectrum: dir.path().join("spectrum.tsv"),
        summary: dir.path().join("summary.json"),
        _dir: dir,
    }
}

/// One biallelic chr1 record with GT:DP:AD entries for tumor and normal.
pub(crate) fn vcf_row(
    pos: u64,
    ref_allele: &str,
    alt_allele: &str,
    tumor: &str,
    normal: &str,
) -> String {
    format!(
        "chr1\t{}\t.\t{}\t{}\t.\t.\t.\tGT:DP:AD\t{}\t{}\n",
        pos, ref_allele, alt_allele, tumor, normal
    )
}

/// 2000 bp of poly-A with three deviating contexts: A[C]G at 1:1000,
/// T[A]C at 1:1250 and C[C]C at 1:1501.
fn reference_sequence() -> Vec<u8> {
    let mut seq = vec![b'A'; 2000];
    seq[999] = b'C';
    seq[1000] = b'G';
    seq[1248] = b'T';
    seq[1250] = b'C';
    seq[1499] = b'C';
    seq[1500] = b'C';
    seq[1501] = b'C';
    seq
}

/// Two signatures over the full catalog. SBSA and SBSB differ in how they
/// spread their weight over the three nonzero classes; every other class has
/// weight zero and is therefore degenerate.
fn signature_library() -> String {
    let mut text = String::from("class\tSBSA\tSBSB\n");
    for class in CATALOG.iter() {
        let label = class.to_string();
        let (a, b) = match label.as_str() {
            DIRECT_CLASS => (0.25, 0.75),
            FLIPPED_CLASS => (0.15, 0.05),
            FILLER_CLASS => (0.6, 0.2),
            _ => (0.0, 0.0),
        };
        text.push_str(&format!("{}\t{}\t{}\n", label, a, b));
    }
    text
}
