use crate::calendar::BookingCalendar;
use crate::cli::{Cli, Commands, ConfigActions};
use crate::config::{get_config_path, Config};
use crate::env_manager;
use crate::form::{FieldKind, Form, FormKind};
use crate::mail::EmailJsClient;
use crate::notify::{Notifier, TerminalNotifier};
use crate::rate_limit::RateLimiter;
use crate::submitter::{SubmissionOutcome, Submitter};
use crate::validation::{parse_date, Validator};
use crate::workflow::SubmissionWorkflow;
use anyhow::{anyhow, Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::sync::Arc;

pub struct Application {
    config: Config,
    validator: Arc<Validator>,
    submitter: Arc<Submitter>,
    notifier: Arc<dyn Notifier>,
    calendar: BookingCalendar,
}

impl Application {
    /// Build the application from configuration. A mail client that cannot
    /// be set up leaves the application usable; submissions then report
    /// the service as unavailable.
    pub fn new(config: Config) -> Result<Self> {
        let hours = config.business_hours.to_business_hours()?;
        for var in env_manager::missing_env_vars() {
            log::warn!("Missing required environment variable: {}", var);
        }
        let limiter = Arc::new(RateLimiter::new(config.submission.cooldown()));

        let submitter = match env_manager::mail_credentials()
            .and_then(|creds| EmailJsClient::new(&config.mail.endpoint, creds))
        {
            Ok(client) => {
                log::debug!("Mail client ready: {:?}", client);
                Submitter::new(Arc::new(client), limiter, config.submission.retry_policy())
            }
            Err(e) => {
                log::warn!("Mail client unavailable: {}", e);
                Submitter::unavailable(e.to_string(), limiter)
            }
        };

        Ok(Self::with_parts(
            config,
            Arc::new(Validator::new(hours)),
            Arc::new(submitter),
            Arc::new(TerminalNotifier),
        ))
    }

    pub fn with_parts(
        config: Config,
        validator: Arc<Validator>,
        submitter: Arc<Submitter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let calendar = BookingCalendar::new(validator.hours().clone());
        Self { config, validator, submitter, notifier, calendar }
    }

    pub fn workflow(&self, kind: FormKind) -> SubmissionWorkflow {
        SubmissionWorkflow::new(
            Form::for_kind(kind),
            Arc::clone(&self.validator),
            Arc::clone(&self.submitter),
            Arc::clone(&self.notifier),
            self.config.mail.destination(kind),
            self.config.submission.debounce(),
        )
    }

    pub async fn run(&self, cli: Cli) -> Result<()> {
        match cli.command {
            None => self.run_interactive(FormKind::Booking).await,
            Some(Commands::Booking(args)) => {
                self.submit_values(FormKind::Booking, &args.field_values()).await.map(|_| ())
            }
            Some(Commands::Contact(args)) => {
                self.submit_values(FormKind::Contact, &args.field_values()).await.map(|_| ())
            }
            Some(Commands::Interactive { form }) => self.run_interactive(form.into()).await,
            Some(Commands::Calendar { days, select }) => {
                self.show_calendar(days, select.as_deref())
            }
            Some(Commands::Config { action }) => self.show_config(action),
        }
    }

    /// Fill a form from (element id, value) pairs and submit it
    pub async fn submit_values(
        &self,
        kind: FormKind,
        values: &[(&str, &str)],
    ) -> Result<SubmissionOutcome> {
        let mut workflow = self.workflow(kind);
        workflow.with_form(|form| -> Result<()> {
            for (id, value) in values {
                form.set(id, value)?;
            }
            Ok(())
        })?;

        let outcome = workflow.submit().await;
        log::info!("{} form finished: {}", kind, outcome.message());
        if !outcome.is_success() {
            print_invalid_fields(&workflow);
        }
        Ok(outcome)
    }

    async fn run_interactive(&self, kind: FormKind) -> Result<()> {
        log::info!("Starting interactive {} form", kind);
        let mut workflow = self.workflow(kind);
        let mut rl = DefaultEditor::new()?;

        println!("Fill in the {} form. Fields marked * are required.", kind);
        if kind == FormKind::Booking {
            let today = self.validator.today();
            let days = self.calendar.upcoming_business_days(today, 5);
            let listed: Vec<String> =
                days.iter().map(|d| d.format("%a %Y-%m-%d").to_string()).collect();
            println!("Next available days: {}", listed.join(", "));
            println!("Open {}.", self.validator.hours().describe());
        }

        let fields: Vec<(String, String, FieldKind, bool, Vec<String>)> =
            workflow.with_form(|form| {
                form.fields()
                    .iter()
                    .map(|f| {
                        let options: Vec<String> = f
                            .options
                            .iter()
                            .map(|o| format!("{} ({})", o.value, o.label))
                            .collect();
                        (f.id.clone(), f.label.clone(), f.kind, f.required, options)
                    })
                    .collect()
            });

        for (id, label, field_kind, required, options) in fields {
            if !options.is_empty() {
                println!("Options: {}", options.join(", "));
            }
            let prompt = format!("{}{}: ", label, if required { "*" } else { "" });

            loop {
                let initial =
                    workflow.with_form(|form| form.value(&id).unwrap_or_default().to_string());
                let line = match rl.readline_with_initial(&prompt, (initial.as_str(), "")) {
                    Ok(line) => line,
                    Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                        println!("Cancelled.");
                        return Ok(());
                    }
                    Err(err) => return Err(err.into()),
                };
                let _ = rl.add_history_entry(line.as_str());

                if let Err(e) = self.apply_input(&workflow, &id, field_kind, line.trim()) {
                    println!("❌ {}", e);
                    continue;
                }

                workflow.on_blur(&id);
                workflow.settle().await;
                let reason = workflow
                    .with_form(|form| form.field(&id).and_then(|field| field.tooltip.clone()));
                match reason {
                    Some(reason) => println!("❌ {}", reason),
                    None => break,
                }
            }
        }

        workflow.submit().await;
        Ok(())
    }

    /// Write one typed value into the form. Dates go through the calendar
    /// selection so the default time is filled in as well.
    fn apply_input(
        &self,
        workflow: &SubmissionWorkflow,
        id: &str,
        kind: FieldKind,
        value: &str,
    ) -> Result<()> {
        workflow.with_form(|form| {
            if kind == FieldKind::Date {
                if let Some(date) = parse_date(value) {
                    return self
                        .calendar
                        .select(date, self.validator.today(), form)
                        .map_err(|e| anyhow!("{}", e));
                }
            }
            form.set(id, value).map_err(|e| anyhow!("{}", e))
        })
    }

    fn show_calendar(&self, days: usize, select: Option<&str>) -> Result<()> {
        let views: Vec<&str> = self.calendar.views.iter().map(|v| v.as_str()).collect();
        println!(
            "Calendar views: {} (initial: {})",
            views.join(", "),
            self.calendar.initial_view.as_str()
        );
        println!("Business hours: {}", self.validator.hours().describe());

        let today = self.validator.today();
        println!("Next {} bookable days:", days);
        for day in self.calendar.upcoming_business_days(today, days) {
            println!("  - {}", day.format("%A %Y-%m-%d"));
        }

        if let Some(raw) = select {
            let date = parse_date(raw)
                .ok_or_else(|| anyhow!("Invalid date '{}', expected YYYY-MM-DD", raw))?;
            let mut form = Form::booking();
            self.calendar.select(date, today, &mut form)?;
            println!(
                "Selected {} -> date: {}, time: {}",
                raw,
                form.value("date").unwrap_or_default(),
                form.value("time").unwrap_or_default()
            );
        }
        Ok(())
    }

    fn show_config(&self, action: ConfigActions) -> Result<()> {
        match action {
            ConfigActions::Show => {
                let rendered =
                    toml::to_string_pretty(&self.config).context("Failed to render config")?;
                println!("\nCurrent Configuration:\n{}", rendered);
                let missing = env_manager::missing_env_vars();
                for var in env_manager::REQUIRED_ENV_VARS {
                    if missing.contains(var) {
                        println!("❌ {}: not set", var);
                    } else {
                        println!("✅ {}: set", var);
                    }
                }
            }
            ConfigActions::Path => println!("{}", get_config_path()?.display()),
        }
        Ok(())
    }
}

fn print_invalid_fields(workflow: &SubmissionWorkflow) {
    workflow.with_form(|form| {
        for field in form.fields().iter().filter(|f| f.invalid) {
            println!("  - {}: {}", field.label, field.tooltip.as_deref().unwrap_or("invalid"));
        }
    });
}
