//! Answer personas and output languages

use std::fmt;

pub const DEFAULT_PERSONA: &str = "Groundwater Assistant";
pub const DEFAULT_LANGUAGE: &str = "English";

/// Who the assistant speaks as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persona {
  ProfessionalAssistant,
  FieldTechnician,
  ResearchAnalyst,
  /// Any other label; echoed in the prompt without extra style
  Other(String),
}

impl Persona {
  pub fn parse(label: &str) -> Self {
    match label.trim() {
      "Professional Assistant" => Persona::ProfessionalAssistant,
      "Field Technician" => Persona::FieldTechnician,
      "Research Analyst" => Persona::ResearchAnalyst,
      other => Persona::Other(other.to_string()),
    }
  }

  pub fn label(&self) -> &str {
    match self {
      Persona::ProfessionalAssistant => "Professional Assistant",
      Persona::FieldTechnician => "Field Technician",
      Persona::ResearchAnalyst => "Research Analyst",
      Persona::Other(label) => label,
    }
  }

  /// Style paragraph appended to the prompt
  pub fn style(&self) -> &'static str {
    match self {
      Persona::ProfessionalAssistant => {
        "Respond in a short, precise, and businesslike manner. \
         Focus only on the essential details, avoid unnecessary elaboration, \
         and keep the tone formal and professional."
      }
      Persona::FieldTechnician => {
        "Respond in a moderately detailed way with practical depth. \
         Include step-by-step reasoning or instructions when relevant, \
         highlight common pitfalls or best practices, \
         and maintain a clear but approachable tone as if explaining to a colleague on site."
      }
      Persona::ResearchAnalyst => {
        "Respond in a comprehensive, in-depth manner. \
         Examine the query from multiple perspectives, \
         include reasoning, comparisons, and implications, \
         and provide a structured explanation that reflects analytical thinking. \
         The tone should be formal, evidence-based, and methodical."
      }
      Persona::Other(_) => "",
    }
  }
}

impl Default for Persona {
  fn default() -> Self {
    Persona::Other(DEFAULT_PERSONA.to_string())
  }
}

impl fmt::Display for Persona {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

/// Supported answer languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
  #[default]
  English,
  Hindi,
  Marathi,
  Tamil,
  Telugu,
  Kannada,
  Bengali,
  Gujarati,
  Punjabi,
}

impl Language {
  pub const ALL: [Language; 9] = [
    Language::English,
    Language::Hindi,
    Language::Marathi,
    Language::Tamil,
    Language::Telugu,
    Language::Kannada,
    Language::Bengali,
    Language::Gujarati,
    Language::Punjabi,
  ];

  /// Resolve a display name; unsupported names fall back to English
  pub fn parse(name: &str) -> Self {
    let name = name.trim();
    Self::ALL
      .into_iter()
      .find(|language| language.name().eq_ignore_ascii_case(name))
      .unwrap_or_else(|| {
        if !name.is_empty() {
          tracing::warn!("Unsupported language {name:?}, answering in English");
        }
        Language::English
      })
  }

  pub fn name(&self) -> &'static str {
    match self {
      Language::English => "English",
      Language::Hindi => "Hindi",
      Language::Marathi => "Marathi",
      Language::Tamil => "Tamil",
      Language::Telugu => "Telugu",
      Language::Kannada => "Kannada",
      Language::Bengali => "Bengali",
      Language::Gujarati => "Gujarati",
      Language::Punjabi => "Punjabi",
    }
  }

  /// ISO 639-1 code used for translation
  pub fn code(&self) -> &'static str {
    match self {
      Language::English => "en",
      Language::Hindi => "hi",
      Language::Marathi => "mr",
      Language::Tamil => "ta",
      Language::Telugu => "te",
      Language::Kannada => "kn",
      Language::Bengali => "bn",
      Language::Gujarati => "gu",
      Language::Punjabi => "pa",
    }
  }

  /// Fixed refusal returned for out-of-scope queries and failed generations
  pub fn apology(&self) -> &'static str {
    match self {
      Language::English => "<div>I can only assist with queries related to groundwater and Indian groundwater/rainfall data. Please ask a relevant question.</div>",
      Language::Hindi => "<div>मैं केवल भूजल और भारतीय भूजल/वर्षा डेटा से संबंधित प्रश्नों में सहायता कर सकता हूँ। कृपया एक प्रासंगिक प्रश्न पूछें।</div>",
      Language::Marathi => "<div>मी फक्त भूजल आणि भारतीय भूजल/पावसाच्या डेटाशी संबंधित प्रश्नांमध्ये मदत करू शकतो. कृपया एक संबंधित प्रश्न विचारा.</div>",
      Language::Tamil => "<div>நான் நிலத்தடி நீர் மற்றும் இந்திய நிலத்தடி நீர்/மழை தரவு தொடர்பான கேள்விகளுக்கு மட்டுமே உதவ முடியும். தொடர்புடைய கேள்வியைக் கேளுங்கள்.</div>",
      Language::Telugu => "<div>నేను భూగర్భ జలం మరియు భారతీయ భూగర్భ జలం/వర్షపాతం డేటాకు సంబంధించిన ప్రశ్నలకు మాత్రమే సహాయం చేయగలను. దయచేసి సంబంధిత ప్రశ్న అడగండి.</div>",
      Language::Kannada => "<div>ನಾನು ಭೂಗರ್ಭ ಜಲ ಮತ್ತು ಭಾರತೀಯ ಭೂಗರ್ಭ ಜಲ/ಮಳೆ ಡೇಟಾಕ್ಕೆ ಸಂಬಂಧಿಸಿದ ಪ್ರಶ್ನೆಗಳಿಗೆ ಮಾತ್ರ ಸಹಾಯ ಮಾಡಬಹುದು. ದಯವಿಟ್ಟು ಸಂಬಂಧಿತ ಪ್ರಶ್ನೆಯನ್ನು ಕೇಳಿ.</div>",
      Language::Bengali => "<div>আমি কেবল ভূগর্ভস্থ জল এবং ভারতীয় ভূগর্ভস্থ জল/বৃষ্টিপাতের তথ্য সম্পর্কিত প্রশ্নে সহায়তা করতে পারি। দয়া করে একটি প্রাসঙ্গিক প্রশ্ন জিজ্ঞাসা করুন।</div>",
      Language::Gujarati => "<div>હું ફક્ત ભૂગર્ભજળ અને ભારતીય ભૂગર્ભજળ/વરસાદ ડેટા સંબંધિત પ્રશ્નોમાં મદદ કરી શકું છું. કૃપા કરીને સંબંધિત પ્રશ્ન પૂછો.</div>",
      Language::Punjabi => "<div>ਮੈਂ ਸਿਰਫ ਭੂ-ਜਲ ਅਤੇ ਭਾਰਤੀ ਭੂ-ਜਲ/ਬਾਰਸ਼ ਡੇਟਾ ਨਾਲ ਸਬੰਧਤ ਸਵਾਲਾਂ ਵਿੱਚ ਹੀ ਮਦਦ ਕਰ ਸਕਦਾ ਹਾਂ। ਕਿਰਪਾ ਕਰਕੇ ਇੱਕ ਸੰਬੰਧਿਤ ਸਵਾਲ ਪੁੱਛੋ।</div>",
    }
  }

  pub fn is_english(&self) -> bool {
    matches!(self, Language::English)
  }
}

impl fmt::Display for Language {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unsupported_language_falls_back_to_english() {
    let language = Language::parse("Klingon");
    assert_eq!(language, Language::English);
    assert_eq!(language.code(), "en");
    assert!(language.apology().starts_with("<div>I can only assist"));
  }

  #[test]
  fn test_language_codes() {
    assert_eq!(Language::parse("Hindi").code(), "hi");
    assert_eq!(Language::parse("punjabi").code(), "pa");
    assert_eq!(Language::parse(" Tamil ").name(), "Tamil");
  }

  #[test]
  fn test_persona_styles() {
    assert!(Persona::parse("Field Technician").style().contains("colleague on site"));
    assert_eq!(Persona::parse("Groundwater Assistant").style(), "");
    assert_eq!(Persona::default().label(), DEFAULT_PERSONA);
  }
}
