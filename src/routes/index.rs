use actix_web::HttpResponse;

const INDEX_PAGE: &str = r#"<html>
<body>
	<a href="/login">Google Log In</a>
</body>
</html>"#;

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_PAGE)
}
