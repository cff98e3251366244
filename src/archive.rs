use log::debug;
use regex::Regex;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use zip::ZipArchive;

/// Members considered images live here inside the document container
const MEDIA_PREFIX: &str = "word/media/image";
const MEDIA_EXTENSION: &str = ".png";

static MEDIA_INDEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"image(\d+)").expect("valid media index regex"));

/// Position of an illustration within a document.
///
/// The first four images of a document are, in order, the first reading,
/// the psalm, the second reading and the gospel. Anything after the fourth
/// image is the parish logo and never extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Lectura1,
    Salmo,
    Lectura2,
    Evangelio,
}

impl ImageRole {
    pub const ALL: [ImageRole; 4] = [
        ImageRole::Lectura1,
        ImageRole::Salmo,
        ImageRole::Lectura2,
        ImageRole::Evangelio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ImageRole::Lectura1 => "lectura1",
            ImageRole::Salmo => "salmo",
            ImageRole::Lectura2 => "lectura2",
            ImageRole::Evangelio => "evangelio",
        }
    }

    /// Name of the file written for this role, e.g. `salmo.png`
    pub fn file_name(self) -> String {
        format!("{}{}", self.as_str(), MEDIA_EXTENSION)
    }
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid document container: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("cannot read member {name}: {source}")]
    ReadMember {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of extracting one document.
///
/// `images` lists the roles actually written, in role order, even when the
/// extraction stopped part way with `error`.
#[derive(Debug, Default)]
pub struct Extraction {
    pub images: Vec<ImageRole>,
    /// Number of qualifying image members found in the container
    pub found: usize,
    pub error: Option<ArchiveError>,
}

/// Index embedded in a media member name, if the member is a PNG image
pub fn media_index(name: &str) -> Option<u32> {
    if !name.starts_with(MEDIA_PREFIX) || !name.ends_with(MEDIA_EXTENSION) {
        return None;
    }
    MEDIA_INDEX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Qualifying member names sorted by their numeric index (image2 before image10)
pub fn sorted_media_members<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut members: Vec<(u32, String)> = names
        .into_iter()
        .filter_map(|name| media_index(name).map(|index| (index, name.to_string())))
        .collect();
    members.sort_by_key(|(index, _)| *index);
    members.into_iter().map(|(_, name)| name).collect()
}

/// Extract up to four role images from `docx_path` into `output_dir`.
///
/// Failures are reported on the console and returned in [`Extraction::error`];
/// they never abort the caller.
pub fn extract_images_from_docx(docx_path: &Path, output_dir: &Path) -> Extraction {
    let display_name = docx_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| docx_path.display().to_string());

    let mut extraction = Extraction::default();
    if let Err(e) = extract_into(docx_path, output_dir, &display_name, &mut extraction) {
        println!("  ERROR procesando {}: {}", display_name, e);
        extraction.error = Some(e);
    }
    extraction
}

fn extract_into(
    docx_path: &Path,
    output_dir: &Path,
    display_name: &str,
    extraction: &mut Extraction,
) -> Result<(), ArchiveError> {
    let file = File::open(docx_path).map_err(|source| ArchiveError::Open {
        path: docx_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file)?;

    let members = sorted_media_members(archive.file_names());
    debug!("{}: media members {:?}", display_name, members);
    extraction.found = members.len();

    let selected: Vec<(ImageRole, String)> = ImageRole::ALL
        .into_iter()
        .zip(members)
        .collect();

    if selected.len() < ImageRole::ALL.len() {
        println!(
            "  AVISO: Solo se encontraron {} imágenes en {}",
            selected.len(),
            display_name
        );
    }

    fs::create_dir_all(output_dir).map_err(|source| ArchiveError::Write {
        path: output_dir.to_path_buf(),
        source,
    })?;

    for (role, member) in selected {
        let mut entry = archive.by_name(&member)?;
        // The declared size comes from the container and may be bogus
        let mut buffer = Vec::new();
        entry
            .read_to_end(&mut buffer)
            .map_err(|source| ArchiveError::ReadMember {
                name: member.clone(),
                source,
            })?;

        let output_path = output_dir.join(role.file_name());
        fs::write(&output_path, &buffer).map_err(|source| ArchiveError::Write {
            path: output_path.clone(),
            source,
        })?;
        debug!("{} -> {}", member, output_path.display());

        extraction.images.push(role);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn write_docx(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).expect("create docx");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, data) in members {
            zip.start_file(*name, options).expect("start member");
            zip.write_all(data.as_bytes()).expect("write member");
        }
        zip.finish().expect("finish docx");
    }

    /// Stored (uncompressed) members so their payload can be located and damaged
    fn write_stored_docx(path: &Path, members: &[(&str, &str)], large_file: bool) {
        let file = File::create(path).expect("create docx");
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(large_file);
        for (name, data) in members {
            zip.start_file(*name, options).expect("start member");
            zip.write_all(data.as_bytes()).expect("write member");
        }
        zip.finish().expect("finish docx");
    }

    fn find(haystack: &[u8], needle: &[u8]) -> usize {
        haystack
            .windows(needle.len())
            .position(|w| w == needle)
            .expect("needle present")
    }

    #[test]
    fn test_role_names() {
        let names: Vec<&str> = ImageRole::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, ["lectura1", "salmo", "lectura2", "evangelio"]);
        assert_eq!(ImageRole::Evangelio.file_name(), "evangelio.png");
        assert_eq!(
            serde_json::to_string(&ImageRole::ALL).unwrap(),
            r#"["lectura1","salmo","lectura2","evangelio"]"#
        );
    }

    #[test]
    fn test_media_index() {
        assert_eq!(media_index("word/media/image1.png"), Some(1));
        assert_eq!(media_index("word/media/image12.png"), Some(12));
        assert_eq!(media_index("word/media/image3.jpeg"), None);
        assert_eq!(media_index("word/media/image.png"), None);
        assert_eq!(media_index("word/document.xml"), None);
        assert_eq!(media_index("customXml/media/image1.png"), None);
    }

    #[test]
    fn test_members_sorted_numerically() {
        let names = [
            "word/media/image10.png",
            "word/media/image2.png",
            "word/document.xml",
            "word/media/image1.png",
            "word/media/image3.emf",
        ];
        assert_eq!(
            sorted_media_members(names),
            [
                "word/media/image1.png",
                "word/media/image2.png",
                "word/media/image10.png"
            ]
        );
    }

    #[test]
    fn test_extracts_four_and_ignores_logo() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("Lecturas 2023-10-08 Domingo.docx");
        write_docx(
            &docx,
            &[
                ("word/document.xml", "<w:document/>"),
                ("word/media/image5.png", "logo"),
                ("word/media/image3.png", "third"),
                ("word/media/image1.png", "first"),
                ("word/media/image4.png", "fourth"),
                ("word/media/image2.png", "second"),
            ],
        );
        let out = tmp.path().join("images").join("2023-10-08");

        let extraction = extract_images_from_docx(&docx, &out);

        assert!(extraction.error.is_none());
        assert_eq!(extraction.found, 5);
        assert_eq!(extraction.images, ImageRole::ALL);
        assert_eq!(fs::read(out.join("lectura1.png")).unwrap(), b"first");
        assert_eq!(fs::read(out.join("salmo.png")).unwrap(), b"second");
        assert_eq!(fs::read(out.join("lectura2.png")).unwrap(), b"third");
        assert_eq!(fs::read(out.join("evangelio.png")).unwrap(), b"fourth");
        assert_eq!(fs::read_dir(&out).unwrap().count(), 4);
    }

    #[test]
    fn test_fewer_images_yield_fewer_roles() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("two.docx");
        write_docx(
            &docx,
            &[
                ("word/media/image2.png", "b"),
                ("word/media/image1.png", "a"),
            ],
        );
        let out = tmp.path().join("out");

        let extraction = extract_images_from_docx(&docx, &out);

        assert!(extraction.error.is_none());
        assert_eq!(extraction.images, [ImageRole::Lectura1, ImageRole::Salmo]);
        assert!(out.join("lectura1.png").exists());
        assert!(out.join("salmo.png").exists());
        assert!(!out.join("lectura2.png").exists());
    }

    #[test]
    fn test_overwrites_existing_files() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("one.docx");
        write_docx(&docx, &[("word/media/image1.png", "new")]);
        let out = tmp.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("lectura1.png"), b"old").unwrap();

        let extraction = extract_images_from_docx(&docx, &out);

        assert_eq!(extraction.images, [ImageRole::Lectura1]);
        assert_eq!(fs::read(out.join("lectura1.png")).unwrap(), b"new");
    }

    #[test]
    fn test_corrupt_archive_reports_error() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("broken.docx");
        fs::write(&docx, b"this is not a zip file").unwrap();
        let out = tmp.path().join("out");

        let extraction = extract_images_from_docx(&docx, &out);

        assert!(extraction.images.is_empty());
        assert!(matches!(extraction.error, Some(ArchiveError::Zip(_))));
        assert!(!out.exists());
    }

    #[test]
    fn test_missing_file_reports_open_error() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let extraction =
            extract_images_from_docx(&tmp.path().join("gone.docx"), &tmp.path().join("out"));

        assert!(extraction.images.is_empty());
        assert!(matches!(extraction.error, Some(ArchiveError::Open { .. })));
    }

    #[test]
    fn test_member_failure_keeps_earlier_images() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("damaged.docx");
        write_stored_docx(
            &docx,
            &[
                ("word/media/image1.png", "first-image-bytes"),
                ("word/media/image2.png", "second-image-bytes"),
                ("word/media/image3.png", "third-image-bytes"),
                ("word/media/image4.png", "fourth-image-bytes"),
            ],
            false,
        );
        let mut bytes = fs::read(&docx).unwrap();
        let at = find(&bytes, b"third-image-bytes");
        bytes[at] = b'X';
        fs::write(&docx, &bytes).unwrap();
        let out = tmp.path().join("out");

        let extraction = extract_images_from_docx(&docx, &out);

        assert_eq!(extraction.images, [ImageRole::Lectura1, ImageRole::Salmo]);
        assert!(matches!(
            extraction.error,
            Some(ArchiveError::ReadMember { .. })
        ));
        assert_eq!(fs::read(out.join("salmo.png")).unwrap(), b"second-image-bytes");
        assert!(!out.join("lectura2.png").exists());
        assert!(!out.join("evangelio.png").exists());
    }

    #[test]
    fn test_bogus_declared_size_does_not_panic() {
        let tmp = tempfile::tempdir().expect("create temp dir");
        let docx = tmp.path().join("huge.docx");
        write_stored_docx(&docx, &[("word/media/image1.png", "tiny")], true);

        // Central directory header: 32-bit uncompressed size at 24, name length
        // at 28, extra length at 30, name at 46, extra fields right after.
        let mut bytes = fs::read(&docx).unwrap();
        let cd = find(&bytes, &[0x50, 0x4b, 0x01, 0x02]);
        assert_eq!(&bytes[cd + 24..cd + 28], &[0xff; 4]);
        let name_len = u16::from_le_bytes([bytes[cd + 28], bytes[cd + 29]]) as usize;
        let extra_len = u16::from_le_bytes([bytes[cd + 30], bytes[cd + 31]]) as usize;
        let mut field = cd + 46 + name_len;
        let extra_end = field + extra_len;
        let mut patched = false;
        while field + 4 <= extra_end {
            let id = u16::from_le_bytes([bytes[field], bytes[field + 1]]);
            let len = u16::from_le_bytes([bytes[field + 2], bytes[field + 3]]) as usize;
            if id == 0x0001 {
                bytes[field + 4..field + 12].copy_from_slice(&u64::MAX.to_le_bytes());
                patched = true;
                break;
            }
            field += 4 + len;
        }
        assert!(patched, "zip64 extra field present");
        fs::write(&docx, &bytes).unwrap();
        let out = tmp.path().join("out");

        let extraction = extract_images_from_docx(&docx, &out);

        match &extraction.error {
            None => {
                assert_eq!(extraction.images, [ImageRole::Lectura1]);
                assert_eq!(fs::read(out.join("lectura1.png")).unwrap(), b"tiny");
            }
            Some(_) => assert!(extraction.images.is_empty()),
        }
    }
}
