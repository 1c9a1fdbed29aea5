use anyhow::Result;
use tera::Tera;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../../templates/base.html")),
    ("pagination.html", include_str!("../../templates/pagination.html")),
    ("post/list.html", include_str!("../../templates/post/list.html")),
    ("post/detail.html", include_str!("../../templates/post/detail.html")),
    (
        "post/comment_form.html",
        include_str!("../../templates/post/comment_form.html"),
    ),
    ("post/comment.html", include_str!("../../templates/post/comment.html")),
    ("post/share.html", include_str!("../../templates/post/share.html")),
    ("post/search.html", include_str!("../../templates/post/search.html")),
    ("feed.xml", include_str!("../../templates/feed.xml")),
    ("sitemap.xml", include_str!("../../templates/sitemap.xml")),
];

/// Builds the template set compiled into the binary.
///
/// XML templates are not autoescaped; they apply `escape_xml` to every
/// text value instead.
pub fn load() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(TEMPLATES.iter().copied())?;
    tera.autoescape_on(vec![".html"]);
    Ok(tera)
}
