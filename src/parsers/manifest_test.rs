#[cfg(test)]
mod tests {
    use crate::parsers::manifest::*;
    use std::io::{Cursor, Write};
    use zip::ZipArchive;
    use zip::write::{SimpleFileOptions, ZipWriter};

    const SAMPLE: &str = "Manifest-Version: 1.0\r\n\
Bundle-SymbolicName: org.example.module\r\n\
Import-Package: org.a;version=\"[1.0,2)\",org.b;resolution:=optional,org.c\r\n\
 ,org.d\r\n\
implementation-version: 3.1.0\r\n\
\r\n\
Name: org/example/api/\r\n\
Specification-Version: 1.2\r\n\
Implementation-Version: 1.2.3\r\n\
\r\n";

    #[test]
    fn test_parse_main_and_sections() {
        let manifest = JarManifest::parse(SAMPLE);

        assert_eq!(
            manifest.main_attribute(BUNDLE_SYMBOLIC_NAME),
            Some("org.example.module")
        );
        assert_eq!(
            manifest.main_attribute(IMPORT_PACKAGE),
            Some("org.a;version=\"[1.0,2)\",org.b;resolution:=optional,org.c,org.d")
        );
        assert_eq!(manifest.main_attribute("Implementation-Version"), Some("3.1.0"));

        assert_eq!(manifest.sections.len(), 1);
        let section = manifest.section("org/example/api/").unwrap();
        assert_eq!(section.get("name"), None);
        assert_eq!(
            manifest.package_attribute("org.example.api", SPECIFICATION_VERSION),
            Some("1.2")
        );
        assert_eq!(
            manifest.package_attribute("org.example.api", IMPLEMENTATION_VERSION),
            Some("1.2.3")
        );
        assert_eq!(manifest.package_attribute("org.other", SPECIFICATION_VERSION), None);
    }

    #[test]
    fn test_lf_only_manifest_without_trailing_blank_line() {
        let manifest = JarManifest::parse("Manifest-Version: 1.0\nBundle-Version: 2.0\n");
        assert_eq!(manifest.main_attribute(BUNDLE_VERSION), Some("2.0"));
        assert!(manifest.sections.is_empty());
    }

    #[test]
    fn test_long_lines_are_wrapped_at_72_bytes() {
        let mut manifest = JarManifest::default();
        let long_value = (0..40)
            .map(|i| format!("org.example.pkg{}", i))
            .collect::<Vec<_>>()
            .join(",");
        manifest.set_main_attribute(IMPORT_PACKAGE, long_value.clone());

        let text = manifest.to_manifest_string();
        assert!(text.starts_with("Manifest-Version: 1.0\r\n"));
        for line in text.split("\r\n") {
            assert!(line.len() <= 72, "line too long: {}", line);
        }

        let reparsed = JarManifest::parse(&text);
        assert_eq!(reparsed.main_attribute(IMPORT_PACKAGE), Some(long_value.as_str()));
    }

    #[test]
    fn test_wrapping_respects_multibyte_characters() {
        let mut manifest = JarManifest::default();
        let value = "é".repeat(60);
        manifest.set_main_attribute("Bundle-Description", value.clone());

        let reparsed = JarManifest::parse(&manifest.to_manifest_string());
        assert_eq!(reparsed.main_attribute("Bundle-Description"), Some(value.as_str()));
    }

    #[test]
    fn test_set_main_attribute_replaces_in_place() {
        let mut manifest = JarManifest::parse(SAMPLE);
        manifest.set_main_attribute("import-package", "org.z");

        assert_eq!(manifest.main_attribute(IMPORT_PACKAGE), Some("org.z"));
        let keys: Vec<_> = manifest.main.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "Manifest-Version",
                "Bundle-SymbolicName",
                "Import-Package",
                "implementation-version"
            ]
        );
    }

    #[test]
    fn test_from_archive() {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(MANIFEST_PATH, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(SAMPLE.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let manifest = JarManifest::from_archive(&mut archive).unwrap().unwrap();
        assert_eq!(
            manifest.main_attribute(BUNDLE_SYMBOLIC_NAME),
            Some("org.example.module")
        );

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("org/a/A.class", SimpleFileOptions::default())
            .unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(JarManifest::from_archive(&mut archive).unwrap().is_none());
    }
}
