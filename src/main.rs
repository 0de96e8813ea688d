mod api;
mod dashboard;
mod error;
mod models;
mod recommend;
mod scoring;
mod session;
mod tui;
mod workflow;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};

use api::{DEFAULT_API_URL, ProfilePatch, RegistrationInput};
use models::{AnalysisResult, Credential, JobDescriptionInput};
use recommend::FilterCriteria;
use scoring::{ats_compliance_score, percentage, tier_of};
use session::{AuthOutcome, SessionStore};
use workflow::{Step, Workflow};

#[derive(Parser)]
#[command(name = "resmatch")]
#[command(about = "Resume/job match advisor - analyze resumes against postings and close skill gaps")]
struct Cli {
    /// Base URL of the matching service (or RESMATCH_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session
    Login {
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        email: String,
        username: String,

        /// Full name for the profile
        #[arg(long)]
        full_name: Option<String>,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Discard the persisted session
    Logout,

    /// Show the signed-in profile
    Whoami,

    /// Manage the signed-in profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage uploaded resumes
    Resume {
        #[command(subcommand)]
        command: ResumeCommands,
    },

    /// Run the guided resume-vs-job analysis
    Analyze {
        /// Pre-select a resume and start at the job-details step
        #[arg(short, long)]
        resume: Option<i64>,
    },

    /// Work with past analyses
    Analyses {
        #[command(subcommand)]
        command: AnalysisCommands,
    },

    /// Full-screen browser over past analyses
    Browse {
        /// Number of analyses to load
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Learning recommendations for an analysis
    Recommend {
        /// Analysis ID
        analysis_id: i64,

        /// Keep only courses whose title or skill contains this text
        #[arg(short, long, default_value = "")]
        search: String,

        /// Filter by recommendation type (course, certification, ...)
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// Filter by provider
        #[arg(long, default_value = "all")]
        provider: String,
    },

    /// Resume and analysis summary
    Dashboard,

    /// Ask the career advisor a question
    Ask {
        message: String,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Update profile fields; unset fields are left alone
    Update {
        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        username: Option<String>,

        #[arg(long)]
        full_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum ResumeCommands {
    /// List uploaded resumes
    List,

    /// Delete a resume
    Delete {
        /// Resume ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum AnalysisCommands {
    /// List recent analyses
    List {
        /// Number of analyses to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show one analysis in full
    Show {
        /// Analysis ID
        id: i64,
    },

    /// Delete an analysis
    Delete {
        /// Analysis ID
        id: i64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let api_url = cli
        .api_url
        .or_else(|| std::env::var("RESMATCH_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let mut session = SessionStore::connect(&api_url)?;
    session.initialize();

    let outcome = run(cli.command, &mut session);

    // Central teardown: any credential rejection observed during the
    // command above forces re-authentication, no matter where it happened.
    if session.reconcile() {
        println!("Session expired. Run 'resmatch login <email>' to sign in again.");
    }

    outcome
}

fn run(command: Commands, session: &mut SessionStore) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password")?,
            };
            match session.login(&email, &password) {
                AuthOutcome::Success => {
                    let user = session.user().ok_or_else(|| anyhow!("profile missing after login"))?;
                    println!("Logged in as {} ({}).", user.username, user.email);
                }
                AuthOutcome::Failure(msg) => println!("Login failed: {}", msg),
            }
        }

        Commands::Register {
            email,
            username,
            full_name,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => prompt("Password")?,
            };
            let input = RegistrationInput {
                email,
                username,
                full_name,
                password,
            };
            match session.register(&input) {
                AuthOutcome::Success => println!("Account created. You are now logged in."),
                AuthOutcome::Failure(msg) => println!("Registration failed: {}", msg),
            }
        }

        Commands::Logout => {
            session.logout();
            println!("Logged out.");
        }

        Commands::Whoami => match session.user() {
            Some(user) => {
                println!("User #{}", user.id);
                println!("Email: {}", user.email);
                println!("Username: {}", user.username);
                if let Some(name) = &user.full_name {
                    println!("Name: {}", name);
                }
            }
            None => println!("Not logged in."),
        },

        Commands::Profile { command } => match command {
            ProfileCommands::Update {
                email,
                username,
                full_name,
            } => {
                let patch = ProfilePatch {
                    email,
                    username,
                    full_name,
                };
                if patch.is_empty() {
                    println!("Nothing to update. Pass --email, --username, or --full-name.");
                    return Ok(());
                }
                let user = session.update_user(&patch)?;
                println!("Profile updated: {} ({}).", user.username, user.email);
            }
        },

        Commands::Resume { command } => match command {
            ResumeCommands::List => {
                let cred = require_login(session)?;
                let resumes = session.api().list_resumes(&cred)?;
                if resumes.is_empty() {
                    println!("No resumes uploaded yet.");
                } else {
                    print_resume_table(&resumes);
                }
            }

            ResumeCommands::Delete { id } => {
                let cred = require_login(session)?;
                session.api().delete_resume(&cred, id)?;
                println!("Deleted resume #{}.", id);
            }
        },

        Commands::Analyze { resume } => {
            run_analyze_wizard(session, resume)?;
        }

        Commands::Analyses { command } => match command {
            AnalysisCommands::List { limit } => {
                let cred = require_login(session)?;
                let analyses = session.api().list_analyses(&cred, limit)?;
                if analyses.is_empty() {
                    println!("No analyses found.");
                } else {
                    println!(
                        "{:<6} {:<18} {:>7} {:<18} {:>8}",
                        "ID", "DATE", "MATCH", "RATING", "MISSING"
                    );
                    println!("{}", "-".repeat(62));
                    for analysis in &analyses {
                        println!(
                            "{:<6} {:<18} {:>6}% {:<18} {:>8}",
                            analysis.id,
                            analysis.created_at.format("%Y-%m-%d %H:%M"),
                            percentage(analysis.overall_match_score),
                            tier_of(analysis.overall_match_score).label(),
                            analysis.missing_skills.len()
                        );
                    }
                }
            }

            AnalysisCommands::Show { id } => {
                let cred = require_login(session)?;
                let analysis = session.api().get_analysis(&cred, id)?;
                print_analysis(&analysis);
            }

            AnalysisCommands::Delete { id } => {
                let cred = require_login(session)?;
                session.api().delete_analysis(&cred, id)?;
                println!("Deleted analysis #{}.", id);
            }
        },

        Commands::Browse { limit } => {
            let cred = require_login(session)?;
            tui::run_browse(session.api(), &cred, limit)?;
        }

        Commands::Recommend {
            analysis_id,
            search,
            kind,
            provider,
        } => {
            let cred = require_login(session)?;
            let records = session
                .api()
                .recommendations_for_analysis(&cred, analysis_id)?;
            if records.is_empty() {
                println!("No recommendations for analysis #{}.", analysis_id);
                println!("That usually means your skills already line up with the job.");
                return Ok(());
            }

            let criteria = FilterCriteria::new(&search, &kind, &provider);
            let kept = recommend::filter(&records, &criteria);
            println!(
                "{} of {} recommendations match the filters.\n",
                kept.len(),
                records.len()
            );

            for (skill, courses) in recommend::group_by_skill(&kept) {
                println!("== {} ({}) ==", skill, courses.len());
                for course in courses {
                    let provider = course.provider.as_deref().unwrap_or("unknown provider");
                    print!("  {} [{}, {}]", course.title, course.recommendation_type, provider);
                    if let Some(rating) = course.rating {
                        print!(" {:.1}*", rating);
                    }
                    println!();
                    if let Some(duration) = &course.duration {
                        print!("    {}", duration);
                        if let Some(price) = &course.price {
                            print!(" - {}", price);
                        }
                        println!();
                    }
                    if let Some(url) = &course.url {
                        println!("    {}", url);
                    }
                }
                println!();
            }
        }

        Commands::Dashboard => {
            let cred = require_login(session)?;
            let data = dashboard::fetch(session.api(), &cred)?;

            println!("Resumes:          {}", data.summary.total_resumes);
            println!("Recent analyses:  {}", data.summary.total_analyses);
            println!(
                "Average match:    {}% (last {} analyses)",
                percentage(data.summary.average_match_score),
                data.recent_analyses.len()
            );
            println!("Skills to learn:  {}", data.summary.skills_to_learn);

            if !data.resumes.is_empty() {
                println!("\nYour resumes:");
                print_resume_table(&data.resumes);
            }

            if !data.recent_analyses.is_empty() {
                println!("\nRecent analyses:");
                for analysis in &data.recent_analyses {
                    println!(
                        "  #{:<5} {}  {:>3}%  {}",
                        analysis.id,
                        analysis.created_at.format("%Y-%m-%d"),
                        percentage(analysis.overall_match_score),
                        tier_of(analysis.overall_match_score).label()
                    );
                }
            }
        }

        Commands::Ask { message } => {
            let cred = require_login(session)?;
            let reply = session.api().ask_advisor(&cred, &message)?;
            println!("{}", reply.response.trim());
            if !reply.suggestions.is_empty() {
                println!("\nYou could also ask:");
                for suggestion in &reply.suggestions {
                    println!("  - {}", suggestion);
                }
            }
        }
    }

    Ok(())
}

fn require_login(session: &SessionStore) -> Result<Credential> {
    session
        .require_credential()
        .map_err(|_| anyhow!("not logged in - run 'resmatch login <email>' first"))
}

// --- Analyze wizard ---

fn run_analyze_wizard(session: &SessionStore, deep_link: Option<i64>) -> Result<()> {
    let cred = require_login(session)?;
    let api = session.api();

    let resumes = api.list_resumes(&cred)?;
    if resumes.is_empty() {
        println!("No resumes uploaded yet. Upload one through the web app first.");
        return Ok(());
    }

    let mut workflow = match deep_link {
        Some(id) => Workflow::with_resume(id),
        None => Workflow::new(),
    };

    loop {
        println!("\n--- {} ---", workflow.step().title());

        match workflow.step() {
            Step::SelectResume => {
                print_resume_table(&resumes);
                let input = prompt("Resume ID (q to quit)")?;
                if input.eq_ignore_ascii_case("q") {
                    return Ok(());
                }
                match input.parse::<i64>() {
                    Ok(id) if resumes.iter().any(|r| r.id == id) => workflow.select_resume(id),
                    _ => {
                        println!("No resume with that ID.");
                        continue;
                    }
                }
                workflow.advance();
            }

            Step::EnterJob => {
                let title = prompt("Job title (optional)")?;
                let company = prompt("Company (optional)")?;
                println!("Paste the job description. Finish with a single '.' on its own line:");
                let raw_text = read_block()?;

                workflow.set_job(JobDescriptionInput {
                    title: non_empty(title),
                    company: non_empty(company),
                    raw_text,
                });
                if !workflow.advance() {
                    if let Some(error) = workflow.error() {
                        println!("Cannot continue: {}", error);
                    }
                }
            }

            Step::Review => {
                let job = workflow.job();
                if let Some(id) = workflow.selected_resume() {
                    let filename = resumes
                        .iter()
                        .find(|r| r.id == id)
                        .map(|r| r.filename.as_str())
                        .unwrap_or("(unknown)");
                    println!("Resume:  #{} {}", id, filename);
                }
                println!("Title:   {}", job.title.as_deref().unwrap_or("-"));
                println!("Company: {}", job.company.as_deref().unwrap_or("-"));
                println!("Description: {} characters", job.raw_text.trim().len());

                let choice = prompt("[r]un analysis, [b]ack, [q]uit")?;
                match choice.to_lowercase().as_str() {
                    "r" => match workflow.submit(api, &cred) {
                        Some(result) => {
                            print_analysis(&result);
                            return Ok(());
                        }
                        None => {
                            if let Some(error) = workflow.error() {
                                println!("Analysis failed: {}", error);
                                println!("Fix the problem and run it again, or go back.");
                            }
                        }
                    },
                    "b" => workflow.back(),
                    "q" => return Ok(()),
                    _ => println!("Unknown choice."),
                }
            }
        }
    }
}

// --- Console helpers ---

fn prompt(label: &str) -> Result<String> {
    print!("{}> ", label);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line.trim().to_string())
}

/// Reads lines until a lone '.' or EOF.
fn read_block() -> Result<String> {
    let mut text = String::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.context("failed to read input")?;
        if line.trim() == "." {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

fn print_resume_table(resumes: &[models::ResumeRecord]) {
    println!("{:<6} {:<32} {:<8} {:<12} {:>7}", "ID", "FILENAME", "TYPE", "UPLOADED", "SKILLS");
    println!("{}", "-".repeat(70));
    for resume in resumes {
        println!(
            "{:<6} {:<32} {:<8} {:<12} {:>7}",
            resume.id,
            truncate(&resume.filename, 30),
            resume.file_type,
            resume.created_at.format("%Y-%m-%d"),
            resume.extracted_skills.len()
        );
    }
}

fn print_analysis(analysis: &AnalysisResult) {
    let tier = tier_of(analysis.overall_match_score);
    println!("\nAnalysis #{}", analysis.id);
    println!(
        "{} - {}% overall match",
        tier.label(),
        percentage(analysis.overall_match_score)
    );
    println!("Run: {}", analysis.created_at.format("%Y-%m-%d %H:%M:%S"));

    println!("\nScores:");
    println!("  Technical skills:    {:>3}%", percentage(analysis.technical_skills_score));
    println!("  Experience:          {:>3}%", percentage(analysis.experience_score));
    println!("  Education:           {:>3}%", percentage(analysis.education_score));
    println!("  Semantic similarity: {:>3}%", percentage(analysis.semantic_similarity_score));
    println!("  ATS compliance:      {:>3}%", percentage(ats_compliance_score(analysis)));

    if !analysis.matching_skills.is_empty() {
        println!("\nMatching skills ({}):", analysis.matching_skills.len());
        for line in textwrap::fill(&analysis.matching_skills.join(", "), 72).lines() {
            println!("  {}", line);
        }
    }

    if !analysis.missing_skills.is_empty() {
        println!("\nMissing skills ({}):", analysis.missing_skills.len());
        for line in textwrap::fill(&analysis.missing_skills.join(", "), 72).lines() {
            println!("  {}", line);
        }
        println!("\nSee learning resources: resmatch recommend {}", analysis.id);
    }

    if analysis.ats_feedback.is_empty() {
        println!("\nATS feedback: no flagged issues.");
    } else {
        println!("\nATS feedback:");
        for feedback in &analysis.ats_feedback {
            println!("  - {}", feedback);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        // Filenames are user input, so the cut must land on a char boundary.
        let mut cut = max.saturating_sub(3);
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}...", &s[..cut])
    }
}
