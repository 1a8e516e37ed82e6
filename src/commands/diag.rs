//! Pod diagnostics: logs and events.

use crate::ui;
use anyhow::Result;
use kubekit::Kubectl;

pub fn logs(pod: &str) -> Result<()> {
    let kubectl = Kubectl::new()?;
    print!("{}", kubectl.pod_logs(pod)?);
    Ok(())
}

pub fn events(pod: &str) -> Result<()> {
    let kubectl = Kubectl::new()?;
    let events = kubectl.events_for(pod)?;
    if events.is_empty() {
        ui::info(&format!("no events involving pod {pod}"));
        return Ok(());
    }
    for event in &events {
        let time = event["lastTimestamp"].as_str().unwrap_or("-");
        let reason = event["reason"].as_str().unwrap_or("-");
        let message = event["message"].as_str().unwrap_or("");
        println!("{time}  {reason}  {message}");
    }
    Ok(())
}
