use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use clap::Args;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use study_core::{Clock, ManualClock, RatingMode, RngHandle, StudyConfig, SystemClock};
use study_flow::{
    CompletionStore, FileStore, InboundParams, MemoryStore, Phase, RecordingNavigator, SessionEnv,
    StudyPayload, StudySession,
};

/// Upper bound on scripted actions before the run is abandoned.
const MAX_STEPS: usize = 10_000;

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Study configuration (YAML or JSON).
    #[arg(long)]
    pub config: PathBuf,
    /// YAML script of the participant's answers.
    #[arg(long)]
    pub script: PathBuf,
    /// Inbound query string, e.g. `pid=P001&cond=0,3`.
    #[arg(long, default_value = "")]
    pub query: String,
    /// Master seed; drawn from entropy when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Directory holding the completion store; in-memory when omitted.
    #[arg(long)]
    pub store_dir: Option<PathBuf>,
    /// Simulated milliseconds spent on each action.
    #[arg(long, default_value_t = 1_500)]
    pub step_ms: i64,
    /// Output directory for `run_report.json`.
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentChoice {
    #[default]
    Accept,
    Decline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Answer {
    Correct,
    Wrong,
}

/// Scripted participant behaviour; every field has a default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimScript {
    #[serde(default)]
    pub consent: ConsentChoice,
    /// Answers per comprehension check; exhausted lists answer correctly.
    #[serde(default)]
    pub checks: Vec<Vec<Answer>>,
    /// Rating values used in turn; the scale midpoint when empty.
    #[serde(default)]
    pub ratings: Vec<i64>,
    #[serde(default)]
    pub free_response: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    config_sha256: String,
    seed: u64,
    study_id: String,
    participant_id: Option<String>,
    final_phase: Phase,
    steps: usize,
    redirect_url: Option<String>,
    payload: Option<StudyPayload>,
}

pub fn run(args: &SimulateArgs) -> Result<(), Box<dyn Error>> {
    let config_bytes = fs::read(&args.config)?;
    let config = Rc::new(StudyConfig::load(&args.config)?);
    let script: SimScript = serde_yaml::from_str(&fs::read_to_string(&args.script)?)?;
    let rng = args
        .seed
        .map_or_else(RngHandle::from_entropy, RngHandle::from_seed);
    let seed = rng.seed();

    let clock = ManualClock::new(SystemClock.now_ms());
    let store: Box<dyn CompletionStore> = match &args.store_dir {
        Some(dir) => Box::new(FileStore::new(dir.join("completion.json"))),
        None => Box::new(MemoryStore::new()),
    };
    let navigator = RecordingNavigator::new();
    let env = SessionEnv {
        clock: Box::new(clock.clone()),
        store,
        navigator: Box::new(navigator.clone()),
    };

    let mut session = StudySession::start(
        Rc::clone(&config),
        &InboundParams::from_query(&args.query),
        env,
        rng,
    )?;
    let steps = drive(&mut session, &script, &clock, args.step_ms)?;

    let report = RunReport {
        config_sha256: hex::encode(Sha256::digest(&config_bytes)),
        seed,
        study_id: config.study.id.clone(),
        participant_id: session.state().participant_id.clone(),
        final_phase: session.phase(),
        steps,
        redirect_url: navigator.last().map(|url| url.to_string()),
        payload: session.payload().cloned(),
    };
    fs::create_dir_all(&args.out)?;
    let report_path = args.out.join("run_report.json");
    fs::write(&report_path, serde_json::to_vec_pretty(&report)?)?;

    println!("final phase: {}", report.final_phase.name());
    if let Some(url) = &report.redirect_url {
        println!("{url}");
    }
    info!("wrote {}", report_path.display());
    Ok(())
}

/// Plays `script` against `session` until a terminal phase; returns the action count.
pub fn drive(
    session: &mut StudySession,
    script: &SimScript,
    clock: &ManualClock,
    step_ms: i64,
) -> Result<usize, Box<dyn Error>> {
    let mut answered: BTreeMap<usize, usize> = BTreeMap::new();
    let mut ratings = script.ratings.iter().copied().cycle();
    let mut steps = 0;

    while !session.phase().is_terminal() {
        if steps == MAX_STEPS {
            return Err(format!("no terminal phase after {MAX_STEPS} actions").into());
        }
        steps += 1;
        clock.advance(step_ms);
        let phase = session.phase();
        debug!("step {steps}: {}", phase.name());
        match phase {
            Phase::Consent => match script.consent {
                ConsentChoice::Accept => session.accept_consent()?,
                ConsentChoice::Decline => session.decline_consent()?,
            },
            Phase::Comprehension { index } => {
                let attempt = answered.entry(index).or_default();
                let answer = script
                    .checks
                    .get(index)
                    .and_then(|answers| answers.get(*attempt))
                    .copied()
                    .unwrap_or(Answer::Correct);
                *attempt += 1;
                let check = session
                    .check()
                    .ok_or("comprehension phase without a check")?;
                let wanted = answer == Answer::Correct;
                let position = check
                    .options()
                    .iter()
                    .position(|entry| entry.item.correct == wanted)
                    .unwrap_or(0);
                session.select_option(position)?;
                session.submit_check()?;
            }
            Phase::Stimulus | Phase::FreeResponse => {
                clock.advance(i64::from(session.gate_remaining_seconds()) * 1_000);
                session.tick();
                if phase == Phase::Stimulus {
                    session.continue_stimulus()?;
                } else {
                    let min_chars = session
                        .config()
                        .free_response
                        .as_ref()
                        .map_or(0, |settings| settings.min_chars);
                    let text = script
                        .free_response
                        .clone()
                        .unwrap_or_else(|| "x".repeat(min_chars));
                    session.submit_free_response(&text)?;
                }
            }
            Phase::Instructions => session.continue_instructions()?,
            Phase::Block1Intro | Phase::Block2Intro => session.continue_intro()?,
            Phase::Transition => session.continue_transition()?,
            Phase::Block1 | Phase::Block2 => {
                let block = phase.block().ok_or("rating phase without a block")?;
                let dv = session.block_variable(block)?;
                let midpoint = (dv.scale_min + dv.scale_max) / 2;
                match session.config().design.rating_mode {
                    RatingMode::Individual => {
                        let value = ratings.next().unwrap_or(midpoint);
                        session.submit_rating(value)?;
                    }
                    RatingMode::Batch => {
                        let batch: BTreeMap<String, i64> = session
                            .state()
                            .block_order(block)
                            .iter()
                            .map(|category| {
                                (category.key.clone(), ratings.next().unwrap_or(midpoint))
                            })
                            .collect();
                        session.submit_batch(&batch)?;
                    }
                }
            }
            Phase::Demographics => {
                let fields = session
                    .config()
                    .demographics
                    .clone()
                    .ok_or("demographics phase without configuration")?;
                let age = script
                    .age
                    .clone()
                    .unwrap_or_else(|| fields.age.min_age.to_string());
                let gender = script
                    .gender
                    .clone()
                    .or_else(|| fields.gender.options.first().cloned())
                    .unwrap_or_default();
                session.submit_demographics(&age, &gender)?;
            }
            Phase::Loading
            | Phase::AlreadyCompleted
            | Phase::Declined
            | Phase::FailedCheck
            | Phase::Redirect => break,
        }
    }
    Ok(steps)
}
