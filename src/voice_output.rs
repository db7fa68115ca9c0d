//! Projection from pattern-level `VoiceData` to an engine-level voice
//! record. Filter blocks exist only when their cutoff is present; the
//! formant block is looked up from a static per-(voice, vowel) table of
//! 5-band values.

use crate::voice::VoiceData;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One formant band: center frequency in Hz, level in dB, bandwidth in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormantBand {
    pub freq: f64,
    pub db: f64,
    pub bandwidth: f64,
}

impl FormantBand {
    /// Linear amplitude of the band.
    pub fn gain(&self) -> f64 {
        10f64.powf(self.db / 20.0)
    }

    /// Q factor of the band resonator.
    pub fn q(&self) -> f64 {
        self.freq / self.bandwidth
    }
}

/// A materialised filter stage with its optional envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub cutoff: f64,
    pub resonance: f64,
    pub attack: Option<f64>,
    pub decay: Option<f64>,
    pub sustain: Option<f64>,
    pub release: Option<f64>,
    pub env_amount: Option<f64>,
}

/// Engine-level voice record handed to the synthesis back-end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceOutput {
    pub sound: Option<String>,
    pub bank: Option<String>,
    pub sound_index: Option<i64>,
    pub note: Option<f64>,
    pub freq: Option<f64>,
    pub gain: f64,
    pub pan: f64,
    pub legato: Option<f64>,
    pub attack: Option<f64>,
    pub decay: Option<f64>,
    pub sustain: Option<f64>,
    pub release: Option<f64>,
    pub speed: Option<f64>,
    pub begin: Option<f64>,
    pub end: Option<f64>,
    pub delay: Option<f64>,
    pub room: Option<f64>,
    pub lpf: Option<FilterParams>,
    pub hpf: Option<FilterParams>,
    pub bpf: Option<FilterParams>,
    pub notch: Option<FilterParams>,
    pub formant: Option<[FormantBand; 5]>,
}

type Bands = [[f64; 3]; 5];

fn blend(a: &Bands, b: &Bands) -> Bands {
    let mut out = [[0.0; 3]; 5];
    for i in 0..5 {
        for j in 0..3 {
            out[i][j] = (a[i][j] + b[i][j]) / 2.0;
        }
    }
    out
}

lazy_static! {
    /// 5-band formant values per (voice, vowel): the standard Csound
    /// vowel-formant tables for a/e/i/o/u, with the umlaut and diphthong
    /// vowels derived as fixed two-vowel blends.
    static ref FORMANT_TABLE: HashMap<(&'static str, String), Bands> = {
        let mut m: HashMap<(&'static str, String), Bands> = HashMap::new();
        let base: [(&str, &str, Bands); 20] = [
            ("soprano", "a", [[800.0, 0.0, 80.0], [1150.0, -6.0, 90.0], [2900.0, -32.0, 120.0], [3900.0, -20.0, 130.0], [4950.0, -50.0, 140.0]]),
            ("soprano", "e", [[350.0, 0.0, 60.0], [2000.0, -20.0, 100.0], [2800.0, -15.0, 120.0], [3600.0, -40.0, 150.0], [4950.0, -56.0, 200.0]]),
            ("soprano", "i", [[270.0, 0.0, 60.0], [2140.0, -12.0, 90.0], [2950.0, -26.0, 100.0], [3900.0, -26.0, 120.0], [4950.0, -44.0, 120.0]]),
            ("soprano", "o", [[450.0, 0.0, 70.0], [800.0, -11.0, 80.0], [2830.0, -22.0, 100.0], [3800.0, -22.0, 130.0], [4950.0, -50.0, 135.0]]),
            ("soprano", "u", [[325.0, 0.0, 50.0], [700.0, -16.0, 60.0], [2700.0, -35.0, 170.0], [3800.0, -40.0, 180.0], [4950.0, -60.0, 200.0]]),
            ("alto", "a", [[800.0, 0.0, 80.0], [1150.0, -4.0, 90.0], [2800.0, -20.0, 120.0], [3500.0, -36.0, 130.0], [4950.0, -60.0, 140.0]]),
            ("alto", "e", [[400.0, 0.0, 60.0], [1600.0, -24.0, 80.0], [2700.0, -30.0, 120.0], [3300.0, -35.0, 150.0], [4950.0, -60.0, 200.0]]),
            ("alto", "i", [[350.0, 0.0, 50.0], [1700.0, -20.0, 100.0], [2700.0, -30.0, 120.0], [3700.0, -36.0, 150.0], [4950.0, -60.0, 200.0]]),
            ("alto", "o", [[450.0, 0.0, 70.0], [800.0, -9.0, 80.0], [2830.0, -16.0, 100.0], [3500.0, -28.0, 130.0], [4950.0, -55.0, 135.0]]),
            ("alto", "u", [[325.0, 0.0, 50.0], [700.0, -12.0, 60.0], [2530.0, -30.0, 170.0], [3500.0, -40.0, 180.0], [4950.0, -64.0, 200.0]]),
            ("tenor", "a", [[650.0, 0.0, 80.0], [1080.0, -6.0, 90.0], [2650.0, -7.0, 120.0], [2900.0, -8.0, 130.0], [3250.0, -22.0, 140.0]]),
            ("tenor", "e", [[400.0, 0.0, 70.0], [1700.0, -14.0, 80.0], [2600.0, -12.0, 100.0], [3200.0, -14.0, 120.0], [3580.0, -20.0, 120.0]]),
            ("tenor", "i", [[290.0, 0.0, 40.0], [1870.0, -15.0, 90.0], [2800.0, -18.0, 100.0], [3250.0, -20.0, 120.0], [3540.0, -30.0, 120.0]]),
            ("tenor", "o", [[400.0, 0.0, 40.0], [800.0, -10.0, 80.0], [2600.0, -12.0, 100.0], [2800.0, -12.0, 120.0], [3000.0, -26.0, 120.0]]),
            ("tenor", "u", [[350.0, 0.0, 40.0], [600.0, -20.0, 60.0], [2700.0, -17.0, 100.0], [2900.0, -14.0, 120.0], [3300.0, -26.0, 120.0]]),
            ("bass", "a", [[600.0, 0.0, 60.0], [1040.0, -7.0, 70.0], [2250.0, -9.0, 110.0], [2450.0, -9.0, 120.0], [2750.0, -20.0, 130.0]]),
            ("bass", "e", [[400.0, 0.0, 40.0], [1620.0, -12.0, 80.0], [2400.0, -9.0, 100.0], [2800.0, -12.0, 120.0], [3100.0, -18.0, 120.0]]),
            ("bass", "i", [[250.0, 0.0, 60.0], [1750.0, -30.0, 90.0], [2600.0, -16.0, 100.0], [3050.0, -22.0, 120.0], [3340.0, -28.0, 120.0]]),
            ("bass", "o", [[400.0, 0.0, 40.0], [750.0, -11.0, 80.0], [2400.0, -21.0, 100.0], [2600.0, -20.0, 120.0], [2900.0, -40.0, 120.0]]),
            ("bass", "u", [[350.0, 0.0, 40.0], [600.0, -20.0, 80.0], [2400.0, -32.0, 100.0], [2675.0, -28.0, 120.0], [2950.0, -36.0, 120.0]]),
        ];
        for (voice, vowel, bands) in base.iter() {
            m.insert((*voice, vowel.to_string()), *bands);
        }
        // Derived vowels as fixed blends of two base vowels
        let blends: [(&str, &str, &str); 7] = [
            ("ae", "a", "e"),
            ("oe", "o", "e"),
            ("ue", "u", "e"),
            ("ei", "e", "i"),
            ("au", "a", "u"),
            ("eu", "e", "u"),
            ("äu", "o", "u"),
        ];
        for voice in ["soprano", "alto", "tenor", "bass"] {
            for (vowel, lhs, rhs) in blends.iter() {
                let a = m[&(voice, lhs.to_string())];
                let b = m[&(voice, rhs.to_string())];
                m.insert((voice, vowel.to_string()), blend(&a, &b));
            }
        }
        m
    };
}

/// Resolve a `vowel` field of the form `"voice:vowel"` or `"vowel"` into the
/// 5-band formant block. Unknown selectors produce no formant.
pub fn formant_bands(selector: &str) -> Option<[FormantBand; 5]> {
    let (voice, vowel) = match selector.split_once(':') {
        Some((v, w)) => (v, w),
        None => ("tenor", selector),
    };
    let voice: &'static str = match voice {
        "soprano" => "soprano",
        "alto" => "alto",
        "tenor" => "tenor",
        "bass" => "bass",
        _ => return None,
    };
    let bands = FORMANT_TABLE.get(&(voice, vowel.to_string()))?;
    let mut out = [FormantBand {
        freq: 0.0,
        db: 0.0,
        bandwidth: 0.0,
    }; 5];
    for (i, band) in bands.iter().enumerate() {
        out[i] = FormantBand {
            freq: band[0],
            db: band[1],
            bandwidth: band[2],
        };
    }
    Some(out)
}

fn filter(
    cutoff: Option<f64>,
    resonance: Option<f64>,
    default_resonance: f64,
    env: [Option<f64>; 5],
) -> Option<FilterParams> {
    cutoff.map(|c| FilterParams {
        cutoff: c,
        resonance: resonance.unwrap_or(default_resonance),
        attack: env[0],
        decay: env[1],
        sustain: env[2],
        release: env[3],
        env_amount: env[4],
    })
}

/// Map a pattern-level voice record onto the engine-level one.
pub fn voice_output(data: &VoiceData) -> VoiceOutput {
    VoiceOutput {
        sound: data.sound.clone(),
        bank: data.bank.clone(),
        sound_index: data.sound_index,
        note: data.note,
        freq: data.freq,
        gain: data.gain.unwrap_or(1.0),
        pan: data.pan.unwrap_or(0.5),
        legato: data.legato,
        attack: data.attack,
        decay: data.decay,
        sustain: data.env_sustain,
        release: data.release,
        speed: data.speed,
        begin: data.begin,
        end: data.end,
        delay: data.delay,
        room: data.room,
        lpf: filter(
            data.cutoff,
            data.resonance,
            0.0,
            [
                data.lpattack,
                data.lpdecay,
                data.lpsustain,
                data.lprelease,
                data.lpenv,
            ],
        ),
        hpf: filter(
            data.hcutoff,
            data.hresonance,
            0.0,
            [
                data.hpattack,
                data.hpdecay,
                data.hpsustain,
                data.hprelease,
                data.hpenv,
            ],
        ),
        bpf: filter(
            data.bandf,
            data.bandq,
            1.0,
            [
                data.bpattack,
                data.bpdecay,
                data.bpsustain,
                data.bprelease,
                data.bpenv,
            ],
        ),
        notch: filter(
            data.notchf,
            data.notchq,
            1.0,
            [
                data.npattack,
                data.npdecay,
                data.npsustain,
                data.nprelease,
                data.npenv,
            ],
        ),
        formant: data.vowel.as_deref().and_then(formant_bands),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_materialise_only_with_cutoff() {
        let mut data = VoiceData::empty();
        data.resonance = Some(0.4);
        let out = voice_output(&data);
        assert!(out.lpf.is_none());

        data.cutoff = Some(800.0);
        let out = voice_output(&data);
        let lpf = out.lpf.unwrap();
        assert_eq!(lpf.cutoff, 800.0);
        assert_eq!(lpf.resonance, 0.4);
        assert!(out.hpf.is_none());
        assert!(out.bpf.is_none());
        assert!(out.notch.is_none());
    }

    #[test]
    fn test_formant_lookup_tenor_a() {
        let bands = formant_bands("tenor:a").unwrap();
        assert_eq!(bands[0].freq, 650.0);
        assert_eq!(bands[0].db, 0.0);
        assert_eq!(bands[1].freq, 1080.0);
        assert_eq!(bands[4].bandwidth, 140.0);
        assert!((bands[0].q() - 650.0 / 80.0).abs() < 1e-12);
        assert!((bands[0].gain() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_formant_defaults_to_tenor() {
        assert_eq!(formant_bands("a"), formant_bands("tenor:a"));
    }

    #[test]
    fn test_formant_blended_vowels_exist() {
        for voice in ["soprano", "alto", "tenor", "bass"] {
            for vowel in ["ae", "oe", "ue", "ei", "au", "eu", "äu"] {
                assert!(
                    formant_bands(&format!("{}:{}", voice, vowel)).is_some(),
                    "missing {}:{}",
                    voice,
                    vowel
                );
            }
        }
        // ae sits halfway between a and e
        let a = formant_bands("bass:a").unwrap();
        let e = formant_bands("bass:e").unwrap();
        let ae = formant_bands("bass:ae").unwrap();
        assert_eq!(ae[0].freq, (a[0].freq + e[0].freq) / 2.0);
    }

    #[test]
    fn test_unknown_vowel_yields_no_formant() {
        assert!(formant_bands("zz").is_none());
        assert!(formant_bands("robot:a").is_none());
        let mut data = VoiceData::empty();
        data.vowel = Some("zz".to_string());
        assert!(voice_output(&data).formant.is_none());
    }

    #[test]
    fn test_voice_output_defaults() {
        let out = voice_output(&VoiceData::empty());
        assert_eq!(out.gain, 1.0);
        assert_eq!(out.pan, 0.5);
        assert!(out.formant.is_none());
    }
}
