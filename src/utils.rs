use indicatif::ProgressStyle;
use regex::Regex;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
        .expect("invalid progress bar template")
}

/// 将逗号分隔的后缀列表转换为不区分大小写的正则
pub fn suffix_regex(suffix: &str) -> Result<Regex, regex::Error> {
    let alternatives = suffix
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| regex::escape(s.trim_start_matches('.')))
        .collect::<Vec<_>>();
    Regex::new(&format!("(?i)^(?:{})$", alternatives.join("|")))
}

/// 原地 L2 归一化，向量为零或包含非有限值时返回 false
pub fn l2_normalize(v: &mut [f32]) -> bool {
    if v.iter().any(|x| !x.is_finite()) {
        return false;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= norm);
    true
}

/// 原地 L1 归一化，存在负数、非有限值或总和为零时返回 false
pub fn l1_normalize(v: &mut [f32]) -> bool {
    if v.iter().any(|x| !x.is_finite() || *x < 0.0) {
        return false;
    }
    let sum = v.iter().sum::<f32>();
    if sum == 0.0 {
        return false;
    }
    v.iter_mut().for_each(|x| *x /= sum);
    true
}
