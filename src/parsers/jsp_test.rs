#[cfg(test)]
mod tests {
    use crate::models::ResourceReferences;
    use crate::parsers::{JspScanner, ResourceScanner};

    fn scan(content: &str) -> ResourceReferences {
        let mut refs = ResourceReferences::new();
        JspScanner::scan("view.jsp", content.as_bytes(), &mut refs).unwrap();
        refs
    }

    #[test]
    fn test_is_match() {
        assert!(JspScanner::is_match("WEB-INF/views/list.jsp"));
        assert!(JspScanner::is_match("fragments/header.JSPF"));
        assert!(JspScanner::is_match("META-INF/tags/box.tag"));
        assert!(!JspScanner::is_match("list.jsp.bak"));
        assert!(!JspScanner::is_match("index.html"));
    }

    #[test]
    fn test_comma_separated_page_imports() {
        let refs = scan(r#"<%@ page import="a.b.C, d.e.F" %>"#);
        assert!(refs.packages.contains("a.b"));
        assert!(refs.packages.contains("d.e"));
        assert_eq!(refs.packages.len(), 2);
    }

    #[test]
    fn test_java_imports_are_ignored() {
        let refs = scan(
            r#"<%@ page language="java" import="java.util.List,java.io.*" %>
<%@ page import='org.jahia.services.content.JCRNodeWrapper' %>"#,
        );
        assert_eq!(
            refs.packages.into_iter().collect::<Vec<_>>(),
            vec!["org.jahia.services.content"]
        );
    }

    #[test]
    fn test_wildcard_and_xml_syntax_imports() {
        let refs = scan(
            r#"<jsp:directive.page import="org.apache.commons.lang.*"/>
<%@page contentType="text/html"
        import="org.slf4j.Logger" %>"#,
        );
        assert!(refs.packages.contains("org.apache.commons.lang"));
        assert!(refs.packages.contains("org.slf4j"));
    }

    #[test]
    fn test_taglib_uris() {
        let refs = scan(
            r#"<%@ taglib prefix="c" uri="http://java.sun.com/jsp/jstl/core" %>
<%@ taglib uri='http://www.jahia.org/tags/templateLib' prefix="template" %>
<%@ taglib prefix="t" tagdir="/WEB-INF/tags" %>"#,
        );
        assert_eq!(refs.taglib_uris.len(), 2);
        assert!(refs.taglib_uris.contains("http://java.sun.com/jsp/jstl/core"));
        assert!(refs.taglib_uris.contains("http://www.jahia.org/tags/templateLib"));
        assert!(refs.packages.is_empty());
    }
}
