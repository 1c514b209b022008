// Server-rendered pages
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::error::AppResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("landing.html", include_str!("../templates/landing.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("nurse_dashboard.html", include_str!("../templates/nurse_dashboard.html")),
    ("patient_detail.html", include_str!("../templates/patient_detail.html")),
    ("patient_info.html", include_str!("../templates/patient_info.html")),
    ("access_patient.html", include_str!("../templates/access_patient.html")),
    ("patient_view.html", include_str!("../templates/patient_view.html")),
];

pub const PRIORITY_LABELS: [&str; 3] = ["Normal", "Sedang", "Tinggi"];

/// Templates are embedded at build time; `.html` names get HTML auto-escaping.
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> AppResult<Self> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        Ok(Self { env })
    }

    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> AppResult<Html<String>> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}
