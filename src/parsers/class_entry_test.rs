#[cfg(test)]
mod tests {
    use crate::models::ResourceReferences;
    use crate::parsers::class_entry::{
        ClassParseError, class_references, package_for_entry, package_of_binary_name,
        parse_class_file,
    };
    use crate::parsers::{ClassScanner, ResourceScanner};

    fn utf8(pool: &mut Vec<u8>, value: &str) {
        pool.push(1);
        pool.extend_from_slice(&(value.len() as u16).to_be_bytes());
        pool.extend_from_slice(value.as_bytes());
    }

    fn class(pool: &mut Vec<u8>, name_index: u16) {
        pool.push(7);
        pool.extend_from_slice(&name_index.to_be_bytes());
    }

    /// `org.example.Foo extends Object`, referencing a handful of classes.
    fn sample_class() -> Vec<u8> {
        let mut pool = Vec::new();
        utf8(&mut pool, "org/example/Foo"); // 1
        class(&mut pool, 1); // 2
        utf8(&mut pool, "java/lang/Object"); // 3
        class(&mut pool, 3); // 4
        utf8(&mut pool, "org/other/Bar"); // 5
        class(&mut pool, 5); // 6
        utf8(&mut pool, "(Lorg/dep/Arg;)Ljava/util/List<Lorg/gen/Item;>;"); // 7
        pool.push(5); // 8 and 9: long
        pool.extend_from_slice(&42u64.to_be_bytes());
        utf8(&mut pool, "[Lorg/arr/Elem;"); // 10
        class(&mut pool, 10); // 11
        utf8(&mut pool, "Looks like text; not a type"); // 12
        pool.push(12); // 13: name and type
        pool.extend_from_slice(&[0, 5, 0, 7]);

        let mut data = Vec::new();
        data.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&52u16.to_be_bytes());
        data.extend_from_slice(&14u16.to_be_bytes());
        data.extend_from_slice(&pool);
        data.extend_from_slice(&0x0021u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&4u16.to_be_bytes());
        data
    }

    #[test]
    fn test_package_for_entry() {
        assert_eq!(
            package_for_entry("org/example/impl/Foo.class"),
            Some("org.example.impl".to_string())
        );
        assert_eq!(
            package_for_entry("org/example/messages.properties"),
            Some("org.example".to_string())
        );
        assert_eq!(package_for_entry("Foo.class"), None);
        assert_eq!(package_for_entry("org/example/"), None);
        assert_eq!(package_for_entry("META-INF/MANIFEST.MF"), None);
        assert_eq!(package_for_entry("OSGI-INF/blueprint/ctx.xml"), None);
        assert_eq!(package_for_entry("OSGI-OPT/src/org/a/A.java"), None);
        assert_eq!(package_for_entry("WEB-INF/classes/org/a/A.class"), None);
        assert_eq!(package_for_entry("org/osgi/framework/Bundle.class"), None);
        assert_eq!(package_for_entry("org/osgi/Foo.class"), None);
        assert_eq!(
            package_for_entry("org/osgiish/Foo.class"),
            Some("org.osgiish".to_string())
        );
        assert_eq!(package_for_entry("css/font-awesome/fa.css"), None);
    }

    #[test]
    fn test_class_references_from_constant_pool() {
        let class_file = parse_class_file(&sample_class()).unwrap();
        assert_eq!(class_file.name, "org.example.Foo");

        let references: Vec<_> = class_file.references.into_iter().collect();
        assert_eq!(
            references,
            vec![
                "java.lang.Object",
                "java.util.List",
                "org.arr.Elem",
                "org.dep.Arg",
                "org.gen.Item",
                "org.other.Bar"
            ]
        );
    }

    #[test]
    fn test_invalid_class_files_are_errors() {
        assert!(class_references(b"not a class").is_err());

        let mut truncated = sample_class();
        truncated.truncate(30);
        assert!(class_references(&truncated).is_err());
    }

    #[test]
    fn test_invalid_class_files_have_typed_causes() {
        let err = parse_class_file(b"\x00\x01\x02\x03rest").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassParseError>(),
            Some(ClassParseError::InvalidMagic(0x00010203))
        ));

        let mut unknown_tag = sample_class();
        unknown_tag[10] = 99;
        let err = parse_class_file(&unknown_tag).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassParseError>(),
            Some(ClassParseError::UnsupportedConstant { tag: 99, index: 1 })
        ));
    }

    #[test]
    fn test_wide_constant_in_last_pool_slot_is_rejected() {
        // 0xFFFF slots: 65533 integers fill 1..=65533, a long then claims
        // 65534 and the nonexistent 65535.
        let mut data = Vec::new();
        data.extend_from_slice(&0xCAFEBABEu32.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&52u16.to_be_bytes());
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        for _ in 0..65533 {
            data.push(3);
            data.extend_from_slice(&[0, 0, 0, 0]);
        }
        data.push(5);
        data.extend_from_slice(&[0; 8]);
        data.extend_from_slice(&0x0021u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());

        let err = parse_class_file(&data).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClassParseError>(),
            Some(ClassParseError::InvalidConstantIndex { index: 65534 })
        ));
        assert!(class_references(&data).is_err());
    }

    #[test]
    fn test_class_scanner_adds_non_java_packages() {
        let mut refs = ResourceReferences::new();
        ClassScanner::scan("org/example/Foo.class", &sample_class(), &mut refs).unwrap();

        let packages: Vec<_> = refs.packages.into_iter().collect();
        assert_eq!(packages, vec!["org.arr", "org.dep", "org.gen", "org.other"]);
        assert_eq!(package_of_binary_name("org.a.B$C"), Some("org.a"));
    }
}
