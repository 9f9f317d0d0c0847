use std::io::Write;
use std::path::Path;

use anyhow::bail;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use vista_engine::Artifact;
use vista_render::to_plain_text;
use vista_types::FetchContext;

use crate::cli::*;
use crate::config::AppConfig;
use crate::runtime;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(&cli.config)?;
    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            config.validate()?;
            runtime::run(config).await
        }
        Command::Render(args) => cmd_render(config, args).await,
        Command::Check => cmd_check(&cli.config, &config),
        Command::SendEmail => cmd_send_email(config).await,
    }
}

async fn cmd_render(config: AppConfig, args: RenderArgs) -> anyhow::Result<()> {
    config.validate()?;
    let components = runtime::build(&config)?;
    let ctx = FetchContext::with_timeout(components.aggregator.config().cycle_timeout);
    let (artifact, report) = components.aggregator.run_cycle(&ctx).await?;
    for name in &report.failed {
        eprintln!("{} source {} failed", "warning:".yellow().bold(), name.bold());
    }

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&render_output(&artifact, &args))?;
    stdout.flush()?;
    Ok(())
}

fn render_output(artifact: &Artifact, args: &RenderArgs) -> Vec<u8> {
    let document = if args.simplified {
        artifact.simplified_or_default()
    } else {
        &artifact.rendered_default
    };
    if args.text {
        to_plain_text(document).into_bytes()
    } else {
        document.to_vec()
    }
}

fn cmd_check(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    let engine = config.engine.engine_config();

    println!("{} {} is valid", "✓".green().bold(), path.display().to_string().bold());
    println!("  Timezone: {}", config.timezone.name().cyan());
    println!(
        "  Refresh: every {}s, cycle timeout {}s, {} concurrent",
        config.engine.refresh_interval_secs,
        engine.cycle_timeout.as_secs(),
        engine.max_concurrency
    );
    println!("  HTTP: {}{}", config.http.address, config.http.path.yellow());
    for spec in &config.sources {
        let cached = if spec.cached {
            format!(", cached {}s", spec.cache_expiry_secs)
        } else {
            String::new()
        };
        let summary = if spec.exclude_from_summary { ", no summary" } else { "" };
        println!(
            "  {} {} ({}{}{})",
            "source".dimmed(),
            spec.name.bold(),
            spec.kind.type_name(),
            cached,
            summary
        );
    }
    match &config.email {
        Some(email) => {
            let schedule = email.schedule(config.timezone)?;
            println!(
                "  Email: daily at {} {} to {} recipient(s)",
                schedule.at().format("%H:%M").to_string().yellow(),
                schedule.timezone().name(),
                email.recipient_list()?.len()
            );
        }
        None => println!("  Email: {}", "disabled".dimmed()),
    }
    Ok(())
}

async fn cmd_send_email(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    let components = runtime::build(&config)?;
    let Some(mail) = components.mail else {
        bail!("no [email] section in configuration");
    };

    let report = components
        .aggregator
        .refresh(&components.store, &CancellationToken::new())
        .await?;
    mail.dispatcher.dispatch().await?;
    println!(
        "{} Report sent ({} sources, {} failed)",
        "✓".green().bold(),
        report.succeeded + report.failed.len(),
        report.failed.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn artifact() -> Artifact {
        let config: AppConfig = toml::from_str(
            r#"
            [render]
            minify = false

            [[sources]]
            type = "static"
            name = "Notes"
            html = "<p>full notes</p>"
            simplified_html = "<p>short notes</p>"
            "#,
        )
        .unwrap();
        let components = runtime::build(&config).unwrap();
        let ctx = FetchContext::with_timeout(std::time::Duration::from_secs(5));
        let (artifact, report) = components.aggregator.run_cycle(&ctx).await.unwrap();
        assert!(report.failed.is_empty());
        artifact
    }

    #[tokio::test]
    async fn render_selects_document() {
        let artifact = artifact().await;

        let full = render_output(&artifact, &RenderArgs { simplified: false, text: false });
        let full = String::from_utf8(full).unwrap();
        assert!(full.contains("<p>full notes</p>"));

        let short = render_output(&artifact, &RenderArgs { simplified: true, text: false });
        let short = String::from_utf8(short).unwrap();
        assert!(short.contains("<p>short notes</p>"));
        assert!(!short.contains("full notes"));
    }

    #[tokio::test]
    async fn render_text_strips_markup() {
        let artifact = artifact().await;
        let text = render_output(&artifact, &RenderArgs { simplified: true, text: true });
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("short notes"));
        assert!(!text.contains("<p>"));
    }

    #[tokio::test]
    async fn send_email_requires_email_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [[sources]]
            type = "static"
            name = "Notes"
            html = ""
            "#,
        )
        .unwrap();
        let err = cmd_send_email(config).await.unwrap_err();
        assert!(err.to_string().contains("[email]"));
    }

    #[test]
    fn check_accepts_minimal_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [[sources]]
            type = "file"
            name = "Disk"
            path = "/var/lib/vista/disk.html"
            "#,
        )
        .unwrap();
        cmd_check(Path::new("vista.toml"), &config).unwrap();
    }
}
