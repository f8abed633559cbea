use gateway_task_client::LifecycleEvent;

/// How events are shown on the terminal.
#[derive(Clone, Copy, Debug)]
pub struct Output {
    pub json: bool,
    pub verbose: bool,
}

/// One line to print, and where.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Stdout(String),
    Stderr(String),
}

impl Output {
    pub fn render(&self, event: &LifecycleEvent) -> Option<Line> {
        if self.json {
            return serde_json::to_string(event).ok().map(Line::Stdout);
        }
        match event {
            LifecycleEvent::Progress { raw, .. } if self.verbose => {
                raw.text_fragment().map(|text| Line::Stderr(format!("... {text}")))
            }
            LifecycleEvent::Progress { .. } => None,
            LifecycleEvent::Completed { message, .. } => Some(Line::Stdout(message.text.clone())),
            LifecycleEvent::Failed { reason, .. } => Some(Line::Stderr(format!("error: {reason}"))),
        }
    }

    pub fn print(&self, event: &LifecycleEvent) {
        match self.render(event) {
            Some(Line::Stdout(line)) => println!("{line}"),
            Some(Line::Stderr(line)) => eprintln!("{line}"),
            None => {}
        }
    }
}
