use serde_json::Value;

/// Render the /status summary as human-readable text.
pub fn render_status(body: &Value) -> String {
    let mut out = String::new();
    let active = body["active_mode"].as_bool().unwrap_or(true);
    out.push_str(&format!(
        "Active mode: {}\n",
        if active { "on" } else { "off" }
    ));

    match body["jobs"].as_object() {
        Some(counts) if !counts.is_empty() => {
            out.push_str("Jobs:\n");
            let mut entries: Vec<(&String, u64)> = counts
                .iter()
                .map(|(status, count)| (status, count.as_u64().unwrap_or(0)))
                .collect();
            entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
            for (status, count) in entries {
                out.push_str(&format!("  {:<12} {}\n", status, count));
            }
        }
        _ => out.push_str("No jobs yet.\n"),
    }
    out
}

/// Render the /jobs listing, newest first, one line per job.
pub fn render_jobs(body: &Value) -> String {
    let Some(jobs) = body.as_array() else {
        return "No jobs.\n".to_string();
    };
    if jobs.is_empty() {
        return "No jobs.\n".to_string();
    }

    let mut out = String::new();
    for job in jobs {
        let id = job["id"].as_i64().unwrap_or(0);
        let status = job["status"].as_str().unwrap_or("?");
        let title = job["identified_title"]
            .as_str()
            .or_else(|| job["disc_label"].as_str())
            .unwrap_or("(unlabeled)");
        let drive = job["drive_id"].as_str().unwrap_or("?");
        out.push_str(&format!(
            "#{:<5} {:<12} drive {:<4} {}\n",
            id, status, drive, title
        ));
        if let Some(error) = job["error_message"].as_str() {
            out.push_str(&format!("       {}\n", error));
        }
    }
    out
}

/// Render the /oversight/check result.
pub fn render_issues(body: &Value) -> String {
    match body["descriptions"].as_array() {
        Some(descriptions) if !descriptions.is_empty() => {
            let mut out = String::new();
            for description in descriptions {
                out.push_str(&format!("! {}\n", description.as_str().unwrap_or("?")));
            }
            out
        }
        _ => "No issues found.\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_rendering() {
        let body = json!({
            "active_mode": false,
            "jobs": {"pending": 2, "complete": 5}
        });
        let text = render_status(&body);
        assert!(text.contains("Active mode: off"));
        assert!(text.contains("complete"));
        assert!(text.contains("5"));
    }

    #[test]
    fn jobs_rendering_falls_back_to_label() {
        let body = json!([
            {"id": 1, "status": "review", "disc_label": "MYSTERY_DISC", "drive_id": "1",
             "identified_title": null, "error_message": null},
            {"id": 2, "status": "failed", "disc_label": "X", "drive_id": "2",
             "identified_title": "The Matrix", "error_message": "skipped by user"},
        ]);
        let text = render_jobs(&body);
        assert!(text.contains("MYSTERY_DISC"));
        assert!(text.contains("The Matrix"));
        assert!(text.contains("skipped by user"));
    }

    #[test]
    fn issue_rendering() {
        assert_eq!(render_issues(&json!({"descriptions": []})), "No issues found.\n");
        let body = json!({"descriptions": ["multiple jobs encoding at once: [1, 2]"]});
        assert!(render_issues(&body).starts_with("! multiple"));
    }
}
