mod automata;
mod dense;
mod regex;
