#[cfg(test)]
mod tests {
    use crate::models::ResourceReferences;
    use crate::parsers::{ResourceScanner, SpringScanner};

    fn scan(content: &str) -> ResourceReferences {
        let mut refs = ResourceReferences::new();
        SpringScanner::scan("META-INF/spring/mod.xml", content.as_bytes(), &mut refs).unwrap();
        refs
    }

    #[test]
    fn test_bean_classes_and_osgi_interfaces() {
        let refs = scan(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<beans xmlns="http://www.springframework.org/schema/beans"
       xmlns:osgi="http://www.springframework.org/schema/osgi"
       xmlns:context="http://www.springframework.org/schema/context">

    <context:component-scan base-package="org.example.web, org.example.services"/>

    <bean id="renderer" class="org.example.render.Renderer">
        <property name="cache" value="${cache.enabled}"/>
    </bean>
    <bean id="lazy" class="${renderer.class}"/>

    <osgi:reference id="jcr" interface="org.jahia.services.content.JCRStoreService"/>
    <osgi:service ref="renderer">
        <osgi:interfaces>
            <value>org.example.api.RenderService</value>
            <value>java.io.Serializable</value>
        </osgi:interfaces>
    </osgi:service>
</beans>"#,
        );

        let packages: Vec<_> = refs.packages.into_iter().collect();
        assert_eq!(
            packages,
            vec![
                "org.example.api",
                "org.example.render",
                "org.example.services",
                "org.example.web",
                "org.jahia.services.content"
            ]
        );
    }

    #[test]
    fn test_undeclared_namespaces_are_skipped() {
        let refs = scan(
            r#"<beans xmlns="http://www.springframework.org/schema/beans">
    <bean class="org.a.Impl"/>
</beans>"#,
        );
        assert_eq!(refs.packages.into_iter().collect::<Vec<_>>(), vec!["org.a"]);
    }

    #[test]
    fn test_dtd_style_context() {
        let refs = scan("<beans><bean id=\"x\" class=\"org.legacy.Bean\"/></beans>");
        assert!(refs.packages.contains("org.legacy"));
    }

    #[test]
    fn test_accepts_only_spring_content() {
        assert!(SpringScanner::accepts(b"<beans xmlns=\"http://www.springframework.org/schema/beans\"/>"));
        assert!(!SpringScanner::accepts(b"<project><modelVersion>4.0.0</modelVersion></project>"));
    }
}
