use regex::{NoExpand, Regex};

use crate::style::Stylesheet;

/// Подгоняет SVG предпросмотра под ширину страницы.
/// Размеры в пикселях заменяются на заданную ширину и высоту 100%.
pub fn fit_svg(svg: &str, width: &str) -> Result<String, regex::Error> {
    let r = Regex::new(r#"<svg width="[^"]+px" height="[^"]+px""#)?;
    let replacement = format!(r#"<svg width="{}" height="100%""#, width);

    Ok(r.replace(svg, NoExpand(&replacement)).into_owned())
}

/// Собирает HTML страницу с предпросмотром.
pub fn html_page(title: &str, svg: &str, stylesheet: &Stylesheet) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}\n</style>\n</head>\n<body>\n<div class=\"preview\">\n{}\n</div>\n<footer><p>やる気</p></footer>\n</body>\n</html>\n",
        escape(title),
        stylesheet.render(),
        svg
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::preview_stylesheet;

    #[test]
    fn fit_svg_replaces_pixel_size() {
        let svg = r#"<svg width="576px" height="1024px" viewBox="0 0 576 1024"><g/></svg>"#;

        assert_eq!(
            fit_svg(svg, "280px").unwrap(),
            r#"<svg width="280px" height="100%" viewBox="0 0 576 1024"><g/></svg>"#
        );
    }

    #[test]
    fn fit_svg_leaves_other_output() {
        assert_eq!(fit_svg("", "280px").unwrap(), "");
        assert_eq!(fit_svg("garbage", "280px").unwrap(), "garbage");
    }

    #[test]
    fn html_page_contains_stylesheet_and_svg() {
        let page = html_page("<Reply>", "<svg/>", &preview_stylesheet("280px"));

        assert!(page.contains("<title>&lt;Reply&gt;</title>"));
        assert!(page.contains(".preview svg"));
        assert!(page.contains("<div class=\"preview\">\n<svg/>\n</div>"));
    }
}
