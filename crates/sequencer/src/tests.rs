#[cfg(test)]
mod tests {
    use crate::{SchedulerConfig, SchedulerDriver, StepNotification, StepScheduler};
    use common::{EngineEvent, EventBus, Section, Tempo};
    use dna::{DnaCell, MasterDna};
    use std::sync::{Arc, Mutex};
    use std::thread::sleep;
    use std::time::Duration;
    use synth::{
        midi_to_freq, AudioGraph, CaptureGraph, Envelope, EnvelopeShape, Generator, Percussion, Voice,
        Waveform,
    };

    fn scheduler_with(dna: MasterDna, bpm: u32) -> (Arc<CaptureGraph>, StepScheduler, Tempo) {
        let graph = Arc::new(CaptureGraph::new());
        let tempo = Tempo::new(bpm);
        let scheduler = StepScheduler::new(
            graph.clone(),
            DnaCell::new(dna),
            tempo.clone(),
            SchedulerConfig::default(),
        )
        .with_seed(7);
        (graph, scheduler, tempo)
    }

    /// Drive the scheduler in 40ms ticks until `steps` steps are scheduled
    fn run_steps(scheduler: &mut StepScheduler, graph: &CaptureGraph, steps: u64) -> Vec<StepNotification> {
        let mut now = graph.current_time();
        scheduler.reset(now);
        while scheduler.step() < steps {
            scheduler.advance(now);
            now += 0.04;
        }
        scheduler.take_due(f64::INFINITY)
    }

    fn is_pad(voice: &Voice) -> bool {
        voice.envelope == Envelope::Shaped(EnvelopeShape::Pad)
    }

    fn with_probability(mut dna: MasterDna, p: f32) -> MasterDna {
        dna.a.prob_map = vec![p; 16];
        dna.b.prob_map = vec![p; 16];
        dna
    }

    #[test]
    fn test_first_kick_lands_after_start_offset() {
        let (graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 105);
        graph.set_time(2.0);
        scheduler.reset(2.0);
        scheduler.advance(2.0);

        let kicks: Vec<f64> = graph
            .voices()
            .iter()
            .filter(|v| v.percussion == Some(Percussion::Kick))
            .map(|v| v.onset)
            .collect();
        assert_eq!(kicks.first().copied(), Some(2.0 + 0.1));

        // the notification waits for the audio clock
        assert!(scheduler.take_due(2.05).is_empty());
        let due = scheduler.take_due(2.1);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].section, Section::A);
        assert_eq!(due[0].step_idx, 0);
    }

    #[test]
    fn test_sections_follow_global_step() {
        let (graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 240);
        let notes = run_steps(&mut scheduler, &graph, 70);

        for note in &notes {
            assert_eq!(note.section, Section::for_step(note.global_step));
            assert_eq!(note.step_idx, (note.global_step % 16) as usize);
        }
        assert_eq!(notes[31].section, Section::A);
        assert_eq!(notes[32].section, Section::B);
        assert_eq!(notes[63].section, Section::B);
        assert_eq!(notes[64].section, Section::A);
    }

    #[test]
    fn test_probability_one_never_suppresses() {
        let mut dna = with_probability(MasterDna::baseline(), 1.0);
        dna.a.drums.kick = vec![true; 16];
        let (graph, mut scheduler, _) = scheduler_with(dna, 120);
        let notes = run_steps(&mut scheduler, &graph, 24);

        let kicks = graph
            .voices()
            .iter()
            .filter(|v| v.percussion == Some(Percussion::Kick))
            .count();
        assert_eq!(kicks, notes.len());
    }

    #[test]
    fn test_probability_zero_keeps_only_pads() {
        let dna = with_probability(MasterDna::baseline(), 0.0);
        let (graph, mut scheduler, _) = scheduler_with(dna.clone(), 120);
        let notes = run_steps(&mut scheduler, &graph, 48);
        let voices = graph.voices();

        assert!(voices.iter().all(is_pad));

        let phrase_starts: Vec<&StepNotification> =
            notes.iter().filter(|n| n.global_step % 8 == 0).collect();
        assert!(phrase_starts.len() >= 6);
        for start in &phrase_starts {
            let chord = dna.section(start.section).chord();
            let voiced = voices.iter().filter(|v| v.onset == start.onset).count();
            assert_eq!(voiced, chord.len(), "pad missing at step {}", start.global_step);
        }
        let expected: usize = phrase_starts
            .iter()
            .map(|n| dna.section(n.section).chord().len())
            .sum();
        assert_eq!(voices.len(), expected);
    }

    #[test]
    fn test_pad_spans_a_phrase() {
        let (graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 120);
        run_steps(&mut scheduler, &graph, 1);
        let pad = graph
            .voices()
            .into_iter()
            .find(is_pad)
            .expect("Pad should sound on step 0");
        assert!((pad.duration - 0.125 * 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_tempo_change_applies_to_next_step() {
        let (_graph, mut scheduler, tempo) = scheduler_with(MasterDna::baseline(), 120);
        scheduler.reset(0.0);
        assert_eq!(scheduler.advance(0.0), 1);

        tempo.set(60);
        scheduler.advance(1.0);
        let notes = scheduler.take_due(f64::INFINITY);
        assert!(notes.len() >= 3);
        assert!((notes[1].onset - notes[0].onset - 0.125).abs() < 1e-9);
        assert!((notes[2].onset - notes[1].onset - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_short_arrays_produce_no_events_past_their_end() {
        let mut dna = MasterDna::baseline();
        dna.a.drums.kick = vec![true; 4];
        dna.a.drums.snare = vec![];
        dna.a.drums.hihat = vec![];
        dna.a.drums.glitch = None;
        dna.a.bass_line = vec![Some(40); 4];
        dna.a.lead_melody = vec![];
        dna.a.arp_pattern = vec![];
        dna.a.prob_map = vec![1.0; 4];
        let (graph, mut scheduler, _) = scheduler_with(dna, 120);
        run_steps(&mut scheduler, &graph, 16);

        let voices: Vec<Voice> = graph
            .voices()
            .into_iter()
            .filter(|v| !is_pad(v))
            .filter(|v| v.onset < 0.1 + 16.0 * 0.125 - 1e-9)
            .collect();
        let kicks = voices
            .iter()
            .filter(|v| v.percussion == Some(Percussion::Kick))
            .count();
        assert_eq!(kicks, 4);
        assert_eq!(voices.len(), 8); // 4 kicks, 4 bass plucks
    }

    #[test]
    fn test_lead_rests_never_sound() {
        let mut dna = with_probability(MasterDna::baseline(), 1.0);
        dna.a.lead_melody = vec![None; 16];
        dna.b.lead_melody = vec![None; 16];
        dna.a.lead_melody[5] = Some(0);
        let (graph, mut scheduler, _) = scheduler_with(dna, 200);
        run_steps(&mut scheduler, &graph, 40);

        let leads: Vec<Voice> = graph
            .voices()
            .into_iter()
            .filter(|v| v.envelope == Envelope::Shaped(EnvelopeShape::Lead))
            .collect();
        // note 0 is a real note (steps 5 and 21), everything else rests
        assert_eq!(leads.len(), 2);
        assert!(leads.iter().all(|v| v.frequency_at(0.0) == midi_to_freq(0)));
    }

    #[test]
    fn test_arpeggio_plays_chord_tones_an_octave_up() {
        let mut dna = with_probability(MasterDna::baseline(), 1.0);
        dna.a.drums.kick = vec![false; 16];
        dna.a.drums.snare = vec![false; 16];
        dna.a.drums.hihat = vec![false; 16];
        dna.a.bass_line = vec![None; 16];
        dna.a.lead_melody = vec![None; 16];
        dna.a.arp_pattern = vec![true; 16];
        dna.a.chord_progression = vec![vec![60, 64, 67], vec![62, 65, 69]];
        let (graph, mut scheduler, _) = scheduler_with(dna, 120);
        run_steps(&mut scheduler, &graph, 16);

        let allowed: Vec<f64> = [72, 76, 79].iter().map(|&n| midi_to_freq(n)).collect();
        let arps: Vec<Voice> = graph
            .voices()
            .into_iter()
            .filter(|v| {
                matches!(
                    v.generator,
                    Generator::Oscillator {
                        waveform: Waveform::Triangle,
                        ..
                    }
                )
            })
            .collect();
        assert!(arps.len() >= 16);
        for arp in &arps {
            assert!(allowed.contains(&arp.frequency_at(0.0)));
            assert_eq!(arp.envelope, Envelope::Shaped(EnvelopeShape::Pluck));
        }
    }

    #[test]
    fn test_small_lag_is_caught_up() {
        let (_graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 120);
        scheduler.reset(0.0);
        scheduler.advance(0.0);
        // steps at 0.225 .. 0.725 all start before 0.6 + 0.2
        assert_eq!(scheduler.advance(0.6), 5);
        assert_eq!(scheduler.step(), 6);
    }

    #[test]
    fn test_large_stall_resynchronizes() {
        let (_graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 120);
        scheduler.reset(0.0);
        scheduler.advance(0.0);

        let scheduled = scheduler.advance(10.0);
        assert_eq!(scheduled, 1);
        assert!(scheduler.next_time() > 10.1);
        // the step counter keeps counting
        assert_eq!(scheduler.step(), 2);
        // 0.225s to 10.1s at 0.125s per step
        assert_eq!(scheduler.skipped_steps(), 79);
    }

    #[test]
    fn test_skipped_steps_accumulate_until_reset() {
        let (_graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 120);
        scheduler.reset(0.0);
        scheduler.advance(0.0);
        assert_eq!(scheduler.skipped_steps(), 0);

        // small lag catches up instead of skipping
        scheduler.advance(0.8);
        assert_eq!(scheduler.skipped_steps(), 0);

        scheduler.advance(10.0);
        let first = scheduler.skipped_steps();
        assert!(first > 0);
        scheduler.advance(20.0);
        assert!(scheduler.skipped_steps() > first);

        scheduler.reset(21.0);
        assert_eq!(scheduler.skipped_steps(), 0);
    }

    #[test]
    fn test_reset_drops_undelivered_steps() {
        let (_graph, mut scheduler, _) = scheduler_with(MasterDna::baseline(), 120);
        scheduler.reset(0.0);
        scheduler.advance(0.0);
        assert!(scheduler.next_due().is_some());

        scheduler.reset(3.0);
        assert!(scheduler.next_due().is_none());
        assert_eq!(scheduler.step(), 0);
        assert!((scheduler.next_time() - 3.1).abs() < 1e-9);
    }

    #[test]
    fn test_driver_delivers_steps_on_the_audio_clock() {
        let graph = Arc::new(CaptureGraph::new());
        let event_bus = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        event_bus.subscribe(move |event| {
            if let EngineEvent::StepBoundary { global_step, .. } = event {
                seen_clone.lock().unwrap().push(*global_step);
            }
        });

        let scheduler = StepScheduler::new(
            graph.clone(),
            DnaCell::default(),
            Tempo::new(120),
            SchedulerConfig::default(),
        );
        let driver = SchedulerDriver::spawn(scheduler, event_bus);
        assert!(!driver.is_running());

        driver.start(graph.clone());
        sleep(Duration::from_millis(60));
        assert!(driver.is_running());

        // clock frozen at 0: step 0 is scheduled but has not sounded
        assert!(!graph.voices().is_empty());
        assert!(driver.position().current().is_none());

        graph.set_time(0.15);
        sleep(Duration::from_millis(120));
        assert_eq!(driver.position().current().map(|n| n.global_step), Some(0));
        assert_eq!(*seen.lock().unwrap(), vec![0]);

        // stopping ends scheduling, the clock moving on adds nothing
        driver.stop();
        sleep(Duration::from_millis(60));
        assert!(!driver.is_running());
        let count = graph.voices().len();
        graph.set_time(5.0);
        sleep(Duration::from_millis(120));
        assert_eq!(graph.voices().len(), count);

        // restarting begins again from step 0 just after the current clock
        driver.start(graph.clone());
        sleep(Duration::from_millis(60));
        assert!(driver.position().current().is_none());
        let restart_onsets: Vec<f64> = graph.voices()[count..].iter().map(|v| v.onset).collect();
        assert!(restart_onsets.iter().all(|&t| t >= 5.1 - 1e-9));
    }
}
